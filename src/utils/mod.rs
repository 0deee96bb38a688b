//! Utils Module
pub mod truncate;

pub use truncate::{truncate_chars, truncate_text, TruncationPolicy};
