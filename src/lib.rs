//! Portal Publish - bundle packager and Central Portal deployment publisher
//!
//! This crate packs staged Maven artifacts into a single ZIP bundle, uploads
//! it to the Central Portal publisher API and waits for the resulting
//! deployment to be validated or published.

pub mod archive;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod portal;
pub mod types;

pub use archive::{BundlePackager, PackageSummary, PackagingError};
pub use config::PublishConfig;
pub use deploy::{BundlePublisher, DeploymentPoller, PublishError, PublishReport};
pub use portal::{PortalApi, PortalClient, PortalError};
pub use types::*;
