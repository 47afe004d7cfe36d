use anyhow::Result;
use clap::Parser;
use portal_publish::cli::{self, PortalPublishCli};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PortalPublishCli::parse();

    let level = match cli.verbosity {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting portal-publish v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = cli::run(cli).await {
        error!("{e:#}");
        return Err(e);
    }

    Ok(())
}
