use crate::archive::BundlePackager;
use crate::cli::options::{Commands, PortalOptions, PortalPublishCli};
use crate::cli::output::{print_package_summary, print_publish_report, print_verification};
use crate::config::PublishConfig;
use crate::deploy::{clear_repository, BundleLayout, BundlePublisher};
use crate::types::{BundleSpec, Credentials, DeploymentId};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run(cli: PortalPublishCli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => PublishConfig::load(path)?,
        None => PublishConfig::default(),
    };

    match cli.command {
        Commands::Bundle { roots, output } => run_bundle(roots, output).await,
        Commands::Publish {
            roots,
            name,
            output,
            build_dir,
            portal,
        } => {
            let layout = BundleLayout::new(build_dir.unwrap_or_else(|| config.build_dir.clone()));
            let output = output.unwrap_or_else(|| layout.bundle_path(&name));
            run_publish(roots, output, resolve_spec(&config, &portal)?).await
        }
        Commands::Status {
            deployment_id,
            portal,
        } => run_status(DeploymentId::new(deployment_id), resolve_spec(&config, &portal)?).await,
        Commands::ClearRepository {
            directory,
            name,
            project_path,
            build_dir,
        } => {
            let directory = directory.unwrap_or_else(|| {
                BundleLayout::new(build_dir.unwrap_or_else(|| config.build_dir.clone()))
                    .repository_dir(&project_path, &name)
            });
            clear_repository(&directory)
                .await
                .with_context(|| format!("Failed to clear {}", directory.display()))?;
            println!("🧹 Cleared {}", directory.display());
            Ok(())
        }
    }
}

/// Command-line values win over the config file.
pub fn resolve_spec(config: &PublishConfig, portal: &PortalOptions) -> Result<BundleSpec> {
    let (Some(username), Some(password)) = (portal.username.clone(), portal.password.clone())
    else {
        bail!("Portal credentials are required (--username/--password or PORTAL_USERNAME/PORTAL_PASSWORD)");
    };

    let mut config = config.clone();
    if let Some(url) = &portal.portal_url {
        config.portal_url = url.clone();
    }
    if let Some(publishing_type) = &portal.publishing_type {
        config.publishing_type = publishing_type.clone();
    }
    if let Some(timeout) = portal.timeout {
        config.verification_timeout_seconds = timeout;
    }
    if let Some(scheme) = portal.auth_scheme {
        config.auth_scheme = scheme;
    }

    Ok(config.bundle_spec(Credentials::new(username, password)))
}

async fn run_bundle(roots: Vec<PathBuf>, output: PathBuf) -> Result<()> {
    let summary = BundlePackager::new(roots)
        .package(&output)
        .await
        .with_context(|| format!("Failed to build bundle {}", output.display()))?;
    print_package_summary(&summary);
    Ok(())
}

async fn run_publish(roots: Vec<PathBuf>, output: PathBuf, spec: BundleSpec) -> Result<()> {
    let publisher = BundlePublisher::new(spec)?;
    let cancel = cancel_on_interrupt();

    info!("Publishing bundle to {}", publisher.spec().portal_url);
    let report = publisher.publish(&roots, &output, &cancel).await?;
    print_publish_report(&report);
    Ok(())
}

async fn run_status(deployment: DeploymentId, spec: BundleSpec) -> Result<()> {
    let publisher = BundlePublisher::new(spec)?;
    let cancel = cancel_on_interrupt();

    let verification = publisher.verify(&deployment, &cancel).await?;
    print_verification(&deployment, &verification);
    Ok(())
}

fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            trigger.cancel();
        }
    });
    cancel
}
