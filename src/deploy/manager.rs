use crate::archive::BundlePackager;
use crate::deploy::{DeploymentPoller, PublishError, Result, Verification};
use crate::portal::{validate_portal_url, PortalApi, PortalClient};
use crate::types::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Summary of one successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub archive: PathBuf,
    pub entries: Vec<String>,
    pub deployment: DeploymentId,
    pub outcome: PublishOutcome,
    pub attempts: u32,
}

impl PublishReport {
    pub fn message(&self) -> &'static str {
        self.outcome.message()
    }
}

/// Packages, uploads and verifies a single bundle.
pub struct BundlePublisher {
    spec: BundleSpec,
    api: Arc<dyn PortalApi>,
    poller: DeploymentPoller,
}

impl BundlePublisher {
    pub fn new(spec: BundleSpec) -> Result<Self> {
        let client = PortalClient::new(&spec)?;
        Self::with_api(spec, Arc::new(client), DeploymentPoller::default())
    }

    pub fn with_api(
        spec: BundleSpec,
        api: Arc<dyn PortalApi>,
        poller: DeploymentPoller,
    ) -> Result<Self> {
        validate_portal_url(&spec.portal_url)?;
        Ok(Self { spec, api, poller })
    }

    pub fn spec(&self) -> &BundleSpec {
        &self.spec
    }

    /// Run the full pipeline for the files under `roots`, writing the bundle
    /// to `output`. The first failure is returned as-is.
    pub async fn publish(
        &self,
        roots: &[PathBuf],
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<PublishReport> {
        info!("Packaging bundle {}", output.display());
        let summary = BundlePackager::new(roots.iter().cloned())
            .package(output)
            .await?;

        if cancel.is_cancelled() {
            return Err(PublishError::Cancelled);
        }

        let deployment = self.api.upload(&summary.output).await?;
        info!("Uploaded {} as deployment {}", summary.output.display(), deployment);

        let verification = self.verify(&deployment, cancel).await?;

        Ok(PublishReport {
            archive: summary.output,
            entries: summary.entries,
            deployment,
            outcome: verification.outcome,
            attempts: verification.attempts,
        })
    }

    /// Wait for an already uploaded deployment to settle.
    pub async fn verify(
        &self,
        deployment: &DeploymentId,
        cancel: &CancellationToken,
    ) -> Result<Verification> {
        self.poller
            .wait(self.api.as_ref(), deployment, &self.spec, cancel)
            .await
    }
}
