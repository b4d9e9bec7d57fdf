//! # Pagination Cursors
//!
//! A cursor is an opaque token naming the `created_at` of the oldest record
//! on the previous page. On the wire it is standard, padded base64 of the
//! timestamp's `YYYY-MM-DDTHH:MM:SS.sssZ` rendering. An empty token means
//! "start from the newest record" when sent, and "no further pages" when
//! returned.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::CoreError;
use crate::temporal::Timestamp;

/// Decoded pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageCursor(Timestamp);

impl PageCursor {
    /// Cursor positioned at `ts`.
    pub fn new(ts: Timestamp) -> Self {
        Self(ts)
    }

    /// The timestamp bound carried by this cursor.
    pub fn timestamp(&self) -> Timestamp {
        self.0
    }

    /// Encode to the opaque wire token.
    pub fn encode(&self) -> String {
        STANDARD.encode(self.0.to_rfc3339_millis())
    }

    /// Decode a wire token.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidCursor`] if the token is not valid base64, does
    /// not decode to UTF-8, or does not hold an RFC 3339 timestamp. The
    /// token is taken as-is: surrounding whitespace makes it invalid.
    pub fn decode(token: &str) -> Result<Self, CoreError> {
        let bytes = STANDARD
            .decode(token)
            .map_err(|e| CoreError::InvalidCursor(format!("not base64: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| CoreError::InvalidCursor("not UTF-8".to_string()))?;
        let ts = Timestamp::parse(&text)
            .map_err(|_| CoreError::InvalidCursor(format!("not a timestamp: {text:?}")))?;
        Ok(Self(ts))
    }

    /// Decode an optional query token, treating an absent or empty token
    /// as "no cursor".
    pub fn decode_optional(token: Option<&str>) -> Result<Option<Self>, CoreError> {
        match token {
            None | Some("") => Ok(None),
            Some(t) => Self::decode(t).map(Some),
        }
    }
}

impl From<Timestamp> for PageCursor {
    fn from(ts: Timestamp) -> Self {
        Self(ts)
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
