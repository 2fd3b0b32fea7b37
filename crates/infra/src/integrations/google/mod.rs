//! Google Calendar and Drive adapters

pub mod calendar;
pub mod drive;
pub mod factory;
pub mod oauth;
pub mod types;

pub use calendar::GoogleCalendarClient;
pub use drive::GoogleDriveClient;
pub use factory::GoogleClientFactory;
pub use oauth::{AccessToken, TokenExchanger};
