//! HTTP client shared by the provider adapters

pub mod client;

pub use client::{ensure_success, HttpClient, HttpClientBuilder};
