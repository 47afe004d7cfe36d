pub mod commands;
pub mod options;
pub mod output;

pub use commands::run;
pub use options::{Commands, PortalOptions, PortalPublishCli};
