//! Route modules.

pub mod images;
