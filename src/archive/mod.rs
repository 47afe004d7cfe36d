//! Bundle archive construction

pub mod error;
pub mod packager;

pub use error::PackagingError;
pub use packager::{is_metadata_file, BundlePackager, PackageSummary};
