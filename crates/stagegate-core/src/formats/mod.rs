//! # Formats
//!
//! Pure byte transformations. File I/O lives in the app layer.

pub mod seed;
pub mod snapshot;
