//! Error conversion helpers

pub mod conversions;

pub use conversions::{status_error, InfraError};
