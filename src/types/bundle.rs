use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORTAL_URL: &str = "https://central.sonatype.com/";
pub const DEFAULT_VERIFICATION_TIMEOUT_SECS: i64 = 10 * 60;

/// Deployment is validated and then waits for a manual release in the portal UI.
pub const PUBLISHING_TYPE_USER_MANAGED: &str = "USER_MANAGED";
/// Deployment is released as soon as validation passes.
pub const PUBLISHING_TYPE_AUTOMATIC: &str = "AUTOMATIC";

/// Username/password pair issued by the portal.
///
/// Both halves are treated as secrets: `Debug` never prints them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Scheme prefix used in the `Authorization` header.
///
/// The portal has historically accepted both forms for the same
/// `base64(username:password)` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthScheme {
    #[default]
    Bearer,
    UserToken,
}

impl AuthScheme {
    pub fn header_prefix(&self) -> &'static str {
        match self {
            AuthScheme::Bearer => "Bearer",
            AuthScheme::UserToken => "UserToken",
        }
    }
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bearer" => Ok(AuthScheme::Bearer),
            "user-token" | "usertoken" => Ok(AuthScheme::UserToken),
            other => Err(format!(
                "unknown auth scheme '{other}' (expected 'bearer' or 'user-token')"
            )),
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::Bearer => write!(f, "bearer"),
            AuthScheme::UserToken => write!(f, "user-token"),
        }
    }
}

/// Everything needed to upload one bundle and verify its deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSpec {
    pub credentials: Credentials,
    pub portal_url: String,
    pub publishing_type: String,
    /// Zero disables status polling after the upload.
    pub verification_timeout: Duration,
    pub auth_scheme: AuthScheme,
}

impl BundleSpec {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            publishing_type: PUBLISHING_TYPE_USER_MANAGED.to_string(),
            verification_timeout: Duration::from_secs(DEFAULT_VERIFICATION_TIMEOUT_SECS as u64),
            auth_scheme: AuthScheme::default(),
        }
    }

    pub fn with_portal_url(mut self, portal_url: impl Into<String>) -> Self {
        self.portal_url = portal_url.into();
        self
    }

    pub fn with_publishing_type(mut self, publishing_type: impl Into<String>) -> Self {
        self.publishing_type = publishing_type.into();
        self
    }

    pub fn with_verification_timeout(mut self, timeout: Duration) -> Self {
        self.verification_timeout = timeout;
        self
    }

    /// Zero or negative values disable verification.
    pub fn with_verification_timeout_secs(self, seconds: i64) -> Self {
        let timeout = u64::try_from(seconds)
            .map(Duration::from_secs)
            .unwrap_or(Duration::ZERO);
        self.with_verification_timeout(timeout)
    }

    pub fn with_auth_scheme(mut self, auth_scheme: AuthScheme) -> Self {
        self.auth_scheme = auth_scheme;
        self
    }

    pub fn verification_enabled(&self) -> bool {
        !self.verification_timeout.is_zero()
    }
}
