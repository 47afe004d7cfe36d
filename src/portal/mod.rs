//! Central Portal publisher API

pub mod auth;
pub mod client;
pub mod error;

pub use auth::AuthHandler;
pub use client::{validate_portal_url, PortalApi, PortalClient, TransportTimeouts};
pub use error::PortalError;
