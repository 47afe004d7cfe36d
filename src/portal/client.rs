//! HTTP client for the portal publisher API

use crate::portal::{AuthHandler, PortalError};
use crate::types::{BundleSpec, DeploymentId, DeploymentState};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, ClientBuilder, Response, StatusCode};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use url::Url;

const UPLOAD_PATH: &str = "api/v1/publisher/upload";
const STATUS_PATH: &str = "api/v1/publisher/status";
const BUNDLE_PART_NAME: &str = "bundle";
const BUNDLE_CONTENT_TYPE: &str = "application/zip";
const USER_AGENT: &str = concat!("portal-publish/", env!("CARGO_PKG_VERSION"));

/// Operations the publisher needs from the portal.
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// Upload a finished bundle and return the deployment it created.
    async fn upload(&self, bundle: &Path) -> Result<DeploymentId, PortalError>;

    /// Fetch the current processing state of a deployment.
    async fn status(&self, deployment: &DeploymentId) -> Result<DeploymentState, PortalError>;
}

/// Bounds on each network operation so a hung server cannot block forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimeouts {
    pub connect: Duration,
    /// Longest pause allowed while the bundle body is being sent.
    pub write: Duration,
    /// Longest wait for the response once the request has been sent.
    pub read: Duration,
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            write: Duration::from_secs(30),
            read: Duration::from_secs(60),
        }
    }
}

/// How much of an upload body the connection has taken so far.
struct UploadProgress {
    length: u64,
    sent: AtomicU64,
    last_activity: Mutex<Instant>,
}

impl UploadProgress {
    fn new(length: u64) -> Self {
        Self {
            length,
            sent: AtomicU64::new(0),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    fn record(&self, bytes: usize) {
        self.sent.fetch_add(bytes as u64, Ordering::Relaxed);
        *self.last_activity.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn is_complete(&self) -> bool {
        self.sent.load(Ordering::Relaxed) >= self.length
    }

    fn last_activity(&self) -> Instant {
        *self.last_activity.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The instant the current phase counts as stalled: `write` after the last
    /// chunk while the body is still going out, `read` once all of it is sent.
    fn deadline(&self, timeouts: &TransportTimeouts) -> Instant {
        let last = self.last_activity();
        if self.is_complete() {
            last + timeouts.read
        } else {
            last + timeouts.write
        }
    }
}

/// Resolves with a description of the stall once the upload stops making progress.
async fn upload_stalled(progress: &UploadProgress, timeouts: TransportTimeouts) -> String {
    loop {
        let deadline = progress.deadline(&timeouts);
        if Instant::now() >= deadline {
            return if progress.is_complete() {
                format!("no response within {:?} after sending the bundle", timeouts.read)
            } else {
                format!("bundle upload made no progress for {:?}", timeouts.write)
            };
        }
        tokio::time::sleep_until(deadline).await;
    }
}

/// Parse the portal base URL, require HTTPS and normalize it to end with `/`.
pub fn validate_portal_url(raw: &str) -> Result<Url, PortalError> {
    let url = parse_base_url(raw)?;
    if url.scheme() != "https" {
        return Err(PortalError::InsecureUrl {
            url: raw.to_string(),
        });
    }
    Ok(url)
}

fn parse_base_url(raw: &str) -> Result<Url, PortalError> {
    let mut url = Url::parse(raw).map_err(|e| PortalError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub struct PortalClient {
    client: Client,
    /// No client-wide read timeout; upload phases are timed by [`upload_stalled`].
    upload_client: Client,
    timeouts: TransportTimeouts,
    base_url: Url,
    publishing_type: String,
    authorization: HeaderValue,
    require_https: bool,
}

impl PortalClient {
    pub fn new(spec: &BundleSpec) -> Result<Self, PortalError> {
        Self::with_timeouts(spec, TransportTimeouts::default())
    }

    pub fn with_timeouts(spec: &BundleSpec, timeouts: TransportTimeouts) -> Result<Self, PortalError> {
        let base_url = validate_portal_url(&spec.portal_url)?;
        Self::build(base_url, spec, timeouts, true)
    }

    /// Client for a local plain-HTTP mock server.
    #[cfg(test)]
    pub(crate) fn allowing_plaintext(
        spec: &BundleSpec,
        timeouts: TransportTimeouts,
    ) -> Result<Self, PortalError> {
        let base_url = parse_base_url(&spec.portal_url)?;
        Self::build(base_url, spec, timeouts, false)
    }

    fn build(
        base_url: Url,
        spec: &BundleSpec,
        timeouts: TransportTimeouts,
        require_https: bool,
    ) -> Result<Self, PortalError> {
        AuthHandler::validate(&spec.credentials)?;

        let mut authorization = HeaderValue::from_str(&AuthHandler::authorization_header(
            spec.auth_scheme,
            &spec.credentials,
        ))
        .map_err(|e| PortalError::InvalidHeader(e.to_string()))?;
        authorization.set_sensitive(true);

        let client = ClientBuilder::new()
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read)
            .user_agent(USER_AGENT)
            .build()
            .map_err(PortalError::Client)?;
        let upload_client = ClientBuilder::new()
            .connect_timeout(timeouts.connect)
            .user_agent(USER_AGENT)
            .build()
            .map_err(PortalError::Client)?;

        Ok(Self {
            client,
            upload_client,
            timeouts,
            base_url,
            publishing_type: spec.publishing_type.clone(),
            authorization,
            require_https,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, PortalError> {
        self.base_url
            .join(path)
            .map_err(|e| PortalError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }

    fn ensure_secure(&self, url: &Url) -> Result<(), PortalError> {
        if self.require_https && url.scheme() != "https" {
            return Err(PortalError::InsecureUrl {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    async fn read_body(url: &Url, response: Response) -> Result<(StatusCode, String), PortalError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortalError::from_request(url, e))?;
        Ok((status, body))
    }
}

#[async_trait]
impl PortalApi for PortalClient {
    async fn upload(&self, bundle: &Path) -> Result<DeploymentId, PortalError> {
        let mut url = self.endpoint(UPLOAD_PATH)?;
        url.query_pairs_mut()
            .append_pair("publishingType", &self.publishing_type);
        self.ensure_secure(&url)?;

        let file_name = bundle
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| PortalError::InvalidBundle {
                path: bundle.to_path_buf(),
            })?;
        let read_error = |e| PortalError::ReadBundle {
            path: bundle.to_path_buf(),
            source: e,
        };
        let file = tokio::fs::File::open(bundle).await.map_err(read_error)?;
        let length = file.metadata().await.map_err(read_error)?.len();

        info!("Uploading bundle {} ({} bytes)", file_name, length);

        let progress = Arc::new(UploadProgress::new(length));
        let tracker = Arc::clone(&progress);
        let chunks = ReaderStream::new(file).inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                tracker.record(bytes.len());
            }
        });

        let part = Part::stream_with_length(Body::wrap_stream(chunks), length)
            .file_name(file_name)
            .mime_str(BUNDLE_CONTENT_TYPE)
            .map_err(|e| PortalError::from_request(&url, e))?;
        let form = Form::new().part(BUNDLE_PART_NAME, part);

        let request = self
            .upload_client
            .post(url.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .multipart(form)
            .send();

        let response = tokio::select! {
            result = request => result.map_err(|e| PortalError::from_request(&url, e))?,
            message = upload_stalled(&progress, self.timeouts) => {
                return Err(PortalError::Timeout {
                    url: url.to_string(),
                    message,
                });
            }
        };

        let (status, body) = tokio::time::timeout(self.timeouts.read, Self::read_body(&url, response))
            .await
            .map_err(|_| PortalError::Timeout {
                url: url.to_string(),
                message: format!("response body not received within {:?}", self.timeouts.read),
            })??;
        if !status.is_success() {
            return Err(PortalError::UploadRejected {
                status: status.as_u16(),
                message: server_message(status, &body),
            });
        }

        debug!("Upload accepted with deployment id {}", body);
        Ok(DeploymentId::new(body))
    }

    async fn status(&self, deployment: &DeploymentId) -> Result<DeploymentState, PortalError> {
        let mut url = self.endpoint(STATUS_PATH)?;
        url.query_pairs_mut().append_pair("id", deployment.as_str());
        self.ensure_secure(&url)?;

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .send()
            .await
            .map_err(|e| PortalError::from_request(&url, e))?;

        let (status, body) = Self::read_body(&url, response).await?;
        if !status.is_success() {
            return Err(PortalError::StatusRejected {
                status: status.as_u16(),
                message: server_message(status, &body),
            });
        }

        parse_status(&body)
    }
}

/// Extract `deploymentState` from a status response body.
pub(crate) fn parse_status(body: &str) -> Result<DeploymentState, PortalError> {
    let malformed = || PortalError::MalformedStatus {
        body: body.to_string(),
    };

    let value: serde_json::Value = serde_json::from_str(body).map_err(|_| malformed())?;
    match value.get("deploymentState") {
        Some(serde_json::Value::String(state)) => Ok(DeploymentState::from(state.as_str())),
        _ => Err(malformed()),
    }
}

fn server_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        body.to_string()
    }
}
