//! # DocketSync Domain
//!
//! Business domain types and models for DocketSync.
//!
//! This crate contains:
//! - Practice, matter, calendar and document models
//! - The provider-neutral remote event shape used by the event mapper
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other DocketSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
