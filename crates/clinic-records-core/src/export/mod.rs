//! Export of patient records for printing and archiving.

mod document;

pub use document::*;
