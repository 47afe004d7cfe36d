use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Invalid portal URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Portal URL must use HTTPS: {url}")]
    InsecureUrl { url: String },

    #[error("Missing portal credential: {0}")]
    MissingCredentials(String),

    #[error("Credentials cannot be sent as an HTTP header: {0}")]
    InvalidHeader(String),

    #[error("Invalid bundle path: {}", path.display())]
    InvalidBundle { path: PathBuf },

    #[error("Failed to read bundle {}: {source}", path.display())]
    ReadBundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to upload bundle (status {status}): {message}")]
    UploadRejected { status: u16, message: String },

    #[error("Failed to verify bundle (status {status}): {message}")]
    StatusRejected { status: u16, message: String },

    #[error("Request to {url} timed out: {message}")]
    Timeout { url: String, message: String },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to parse verification response: {body}")]
    MalformedStatus { body: String },
}

impl PortalError {
    /// Classify a transport failure; connect and read timeouts are transient.
    pub fn from_request(url: &url::Url, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            PortalError::Timeout {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else {
            PortalError::Request {
                url: url.to_string(),
                source: error,
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PortalError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeouts_are_transient() {
        let timeout = PortalError::Timeout {
            url: "https://central.sonatype.com/".to_string(),
            message: "operation timed out".to_string(),
        };
        assert!(timeout.is_transient());

        let rejected = PortalError::StatusRejected {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert!(!rejected.is_transient());
        assert!(!PortalError::MalformedStatus { body: "{}".into() }.is_transient());
    }

    #[test]
    fn test_rejection_messages_carry_status() {
        let error = PortalError::UploadRejected {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to upload bundle (status 401): Unauthorized"
        );
    }
}
