//! # Keyset Pagination
//!
//! Pages are ordered newest first by creation time. A page request carries
//! an optional [`PageCursor`]; only records created strictly before the
//! cursor are eligible. The next cursor names the oldest record returned,
//! and is present only while older records remain.

use crate::cursor::PageCursor;
use crate::error::CoreError;
use crate::temporal::Timestamp;

/// Page size used when the caller does not ask for one (or asks for zero).
pub const DEFAULT_PAGE_SIZE: usize = 3;

/// Largest page size honored; larger requests are clamped.
pub const MAX_PAGE_SIZE: usize = 100;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    cursor: Option<PageCursor>,
    num: usize,
}

impl PageRequest {
    /// Build a request, applying the default and the clamp to `num`.
    pub fn new(cursor: Option<PageCursor>, num: Option<usize>) -> Self {
        let num = match num {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(n) => n.min(MAX_PAGE_SIZE),
        };
        Self { cursor, num }
    }

    /// Build a request from raw query parameters.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidCursor`] if a non-empty cursor token fails to decode.
    pub fn from_query(cursor: Option<&str>, num: Option<usize>) -> Result<Self, CoreError> {
        Ok(Self::new(PageCursor::decode_optional(cursor)?, num))
    }

    /// First page, default size.
    pub fn first() -> Self {
        Self::new(None, None)
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        self.cursor
    }

    pub fn num(&self) -> usize {
        self.num
    }

    /// Whether a record created at `created_at` falls after the cursor bound.
    pub fn admits(&self, created_at: Timestamp) -> bool {
        self.cursor.map_or(true, |c| created_at < c.timestamp())
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<PageCursor>,
}

impl<T> Page<T> {
    /// Wire token for the next page; empty when this is the last page.
    pub fn next_token(&self) -> String {
        self.next_cursor.map(|c| c.encode()).unwrap_or_default()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// Select one page from an unordered collection.
///
/// Records are sorted by `created_at` descending (stable with respect to
/// the input order for equal timestamps), filtered by the request's cursor
/// bound, and cut to `num`. A next cursor is emitted only when at least one
/// eligible record was left out.
pub fn paginate<T>(
    items: impl IntoIterator<Item = T>,
    created_at: impl Fn(&T) -> Timestamp,
    request: &PageRequest,
) -> Page<T> {
    let mut eligible: Vec<T> = items
        .into_iter()
        .filter(|item| request.admits(created_at(item)))
        .collect();
    eligible.sort_by(|a, b| created_at(b).cmp(&created_at(a)));

    let has_more = eligible.len() > request.num();
    eligible.truncate(request.num());

    let next_cursor = if has_more {
        eligible.last().map(|last| PageCursor::new(created_at(last)))
    } else {
        None
    };

    Page {
        items: eligible,
        next_cursor,
    }
}
