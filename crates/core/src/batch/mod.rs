//! Scheduled batch synchronization

pub mod orchestrator;

pub use orchestrator::{BatchOptions, BatchOrchestrator};
