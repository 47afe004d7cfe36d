//! Publisher settings loaded from a YAML file

use crate::deploy::{PublishError, Result};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Non-secret publishing settings. Credentials are supplied separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub portal_url: String,
    pub publishing_type: String,
    /// Zero or negative disables verification.
    pub verification_timeout_seconds: i64,
    pub auth_scheme: AuthScheme,
    pub build_dir: PathBuf,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            publishing_type: PUBLISHING_TYPE_USER_MANAGED.to_string(),
            verification_timeout_seconds: DEFAULT_VERIFICATION_TIMEOUT_SECS,
            auth_scheme: AuthScheme::default(),
            build_dir: PathBuf::from("build"),
        }
    }
}

impl PublishConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PublishError::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&contents).map_err(|e| {
            PublishError::Configuration(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    pub fn bundle_spec(&self, credentials: Credentials) -> BundleSpec {
        BundleSpec::new(credentials)
            .with_portal_url(self.portal_url.clone())
            .with_publishing_type(self.publishing_type.clone())
            .with_verification_timeout_secs(self.verification_timeout_seconds)
            .with_auth_scheme(self.auth_scheme)
    }
}
