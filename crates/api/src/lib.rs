//! # DocketSync API
//!
//! HTTP surface over the sync pipeline: the cron batch trigger, the manual
//! single-matter trigger, matter folder provisioning and document upload.
//! Every trigger route sits behind a shared bearer secret and a per-client
//! rate limit; `/health` is open.

pub mod auth;
pub mod context;
pub mod error;
pub mod logging;
pub mod routes;
pub mod server;

pub use context::AppContext;
pub use error::ApiError;
pub use server::{router, serve};
