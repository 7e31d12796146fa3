//! Domain models for the clinic records system.

mod patient;

pub use patient::*;
