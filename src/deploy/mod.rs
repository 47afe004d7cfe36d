pub mod clock;
pub mod error;
pub mod manager;
pub mod poller;
pub mod staging;

pub use clock::{Clock, ManualClock, Sleeper, TokioClock};
pub use error::*;
pub use manager::{BundlePublisher, PublishReport};
pub use poller::{Backoff, DeploymentPoller, PollerConfig, Verification};
pub use staging::{clear_repository, qualified_bundle_name, BundleLayout};
