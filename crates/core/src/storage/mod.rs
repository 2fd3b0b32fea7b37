//! Matter folder provisioning and document filing

pub mod filer;
pub mod ports;
pub mod provisioner;
pub mod service;

pub use filer::DocumentFiler;
pub use provisioner::{FolderLayout, FolderProvisioner};
pub use service::MatterStorageService;
