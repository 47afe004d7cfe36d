use crate::types::AuthScheme;
use clap::{Args, Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;

/// Package Maven artifacts into a bundle and publish it through the Central Portal
#[derive(Parser, Debug)]
#[command(name = "portal-publish")]
#[command(about = "Package Maven artifacts into a bundle and publish it through the Central Portal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct PortalPublishCli {
    #[command(subcommand)]
    pub command: Commands,

    /// YAML file with publishing settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a bundle archive without uploading it
    Bundle {
        /// Staging repositories or files to include, in order
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Where to write the archive
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build, upload and verify a bundle
    Publish {
        /// Staging repositories or files to include, in order
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Bundle name, used for the default archive file name
        #[arg(short, long, default_value = "central")]
        name: String,

        /// Archive path (defaults to <build-dir>/centralPortalPublishing/bundles/<name>.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Build directory (overrides the config file)
        #[arg(long)]
        build_dir: Option<PathBuf>,

        #[command(flatten)]
        portal: PortalOptions,
    },

    /// Wait for an uploaded deployment to be validated or published
    Status {
        /// Deployment id returned by a previous upload
        deployment_id: String,

        #[command(flatten)]
        portal: PortalOptions,
    },

    /// Delete and recreate a staging repository directory
    ClearRepository {
        /// Directory to clear (defaults to the staging repository of --name)
        directory: Option<PathBuf>,

        /// Bundle name the staging repository belongs to
        #[arg(short, long, default_value = "central")]
        name: String,

        /// `:`-separated project path, e.g. :lib:core
        #[arg(long, default_value = ":")]
        project_path: String,

        /// Build directory (overrides the config file)
        #[arg(long)]
        build_dir: Option<PathBuf>,
    },
}

#[derive(Args, Clone, Default)]
pub struct PortalOptions {
    /// Portal base URL (must be https)
    #[arg(long)]
    pub portal_url: Option<String>,

    /// Publishing type, e.g. USER_MANAGED or AUTOMATIC
    #[arg(long)]
    pub publishing_type: Option<String>,

    /// Verification timeout in seconds; zero or negative skips verification
    #[arg(long, allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    /// Authorization header scheme (bearer, user-token)
    #[arg(long)]
    pub auth_scheme: Option<AuthScheme>,

    /// Portal token username
    #[arg(long, env = "PORTAL_USERNAME")]
    pub username: Option<String>,

    /// Portal token password
    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl fmt::Debug for PortalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalOptions")
            .field("portal_url", &self.portal_url)
            .field("publishing_type", &self.publishing_type)
            .field("timeout", &self.timeout)
            .field("auth_scheme", &self.auth_scheme)
            .field("username", &self.username.as_ref().map(|_| "<redacted>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
