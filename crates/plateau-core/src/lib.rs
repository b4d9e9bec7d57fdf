//! # plateau-core — Foundational Types for the Asset Pipeline
//!
//! Pure, filesystem-free building blocks shared by the archive engine,
//! the HTTP service, and the CLI.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype keys.** [`AssetKey`] can only be obtained through
//!    normalization, so every archive path is derived from a validated,
//!    separator-free name.
//!
//! 2. **Closed purpose set.** [`Purpose`] is an exhaustive enum. Unknown
//!    tags are rejected when parsed, before any storage is touched.
//!
//! 3. **Millisecond timestamps.** [`Timestamp`] truncates to milliseconds
//!    at construction so that a value survives the [`PageCursor`] round
//!    trip unchanged.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `plateau-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod cursor;
pub mod error;
pub mod key;
pub mod page;
pub mod purpose;
pub mod temporal;

pub use cursor::PageCursor;
pub use error::CoreError;
pub use key::AssetKey;
pub use page::{paginate, Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use purpose::{Purpose, ARCHIVE_SUFFIX};
pub use temporal::Timestamp;
