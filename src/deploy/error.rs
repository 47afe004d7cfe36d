use crate::archive::PackagingError;
use crate::portal::PortalError;
use crate::types::DeploymentId;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Packaging failed: {0}")]
    Packaging(#[from] PackagingError),

    #[error(transparent)]
    Portal(#[from] PortalError),

    #[error("Deployment {deployment} failed. Check the Central Portal UI ({portal_url}) for more details.")]
    DeploymentFailed {
        deployment: DeploymentId,
        portal_url: String,
    },

    #[error("Unknown deployment state: {state}")]
    UnknownState { state: String },

    #[error(
        "Timed out after {}s waiting for bundle to be verified. You may need to check the deployment on the Central Portal UI ({portal_url}).",
        timeout.as_secs()
    )]
    VerificationTimeout {
        portal_url: String,
        timeout: Duration,
    },

    #[error("Deployment verification was cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, PublishError>;
