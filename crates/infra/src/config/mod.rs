//! Configuration loading
//!
//! Environment-first loading with a TOML/JSON file fallback.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
