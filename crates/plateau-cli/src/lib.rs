//! # plateau-cli — Asset Pipeline from the Command Line
//!
//! Operates directly on an archive root, without the HTTP service.
//!
//! ## Subcommands
//!
//! - `plateau archive` — Archive a source file under a subject and purpose.
//!   The source file is consumed.
//! - `plateau extract` — Reconstruct an archived file at a destination.
//! - `plateau probe` — Report a file's content type and image dimensions.
//! - `plateau key` — Print the asset key derived from a subject name.
//! - `plateau cursor` — Encode a timestamp as a page cursor, or decode one.
//!
//! ```bash
//! plateau archive --root saved_data/archives --source me.png --subject "Jane Doe" --purpose profile_picture
//! plateau extract --root saved_data/archives --subject "Jane Doe" --purpose profile_picture --out ./me.png
//! plateau cursor decode MjAyNC0wMS0wMlQwMzowNDowNS4xMjNa
//! ```

pub mod archive;
pub mod cursor;
pub mod key;
pub mod probe;
