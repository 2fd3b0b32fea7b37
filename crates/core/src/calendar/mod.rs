//! Calendar synchronization
//!
//! The pull side brings remote changes into the local store using the
//! provider's incremental cursor; the push side writes local changes out.
//! Both go through [`mapper`] so neither ever touches provider field names.

pub mod cursor;
pub mod mapper;
pub mod ports;
pub mod pull;
pub mod push;

pub use cursor::SyncCursorManager;
pub use pull::PullReconciler;
pub use push::{PushAction, PushWriter};
