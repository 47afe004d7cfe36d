use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier returned by the portal for an uploaded bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(String);

impl DeploymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side processing state of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentState {
    Pending,
    Validating,
    Publishing,
    Validated,
    Published,
    Failed,
    Unknown(String),
}

impl DeploymentState {
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentState::Pending => "PENDING",
            DeploymentState::Validating => "VALIDATING",
            DeploymentState::Publishing => "PUBLISHING",
            DeploymentState::Validated => "VALIDATED",
            DeploymentState::Published => "PUBLISHED",
            DeploymentState::Failed => "FAILED",
            DeploymentState::Unknown(state) => state,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            DeploymentState::Pending | DeploymentState::Validating | DeploymentState::Publishing
        )
    }
}

impl From<&str> for DeploymentState {
    fn from(state: &str) -> Self {
        match state {
            "PENDING" => DeploymentState::Pending,
            "VALIDATING" => DeploymentState::Validating,
            "PUBLISHING" => DeploymentState::Publishing,
            "VALIDATED" => DeploymentState::Validated,
            "PUBLISHED" => DeploymentState::Published,
            "FAILED" => DeploymentState::Failed,
            other => DeploymentState::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a successful publish got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishOutcome {
    /// Uploaded without waiting for verification.
    Uploaded,
    /// Passed validation and waits for a manual release.
    Validated,
    Published,
}

impl PublishOutcome {
    pub fn from_terminal_state(state: &DeploymentState) -> Option<Self> {
        match state {
            DeploymentState::Validated => Some(PublishOutcome::Validated),
            DeploymentState::Published => Some(PublishOutcome::Published),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PublishOutcome::Uploaded => "Bundle uploaded; deployment verification was skipped.",
            PublishOutcome::Validated => {
                "Deployment passed validation and is ready to be published manually."
            }
            PublishOutcome::Published => "Deployment was successfully published.",
        }
    }
}
