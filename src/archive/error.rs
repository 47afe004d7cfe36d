use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("Duplicate bundle entry: {path}")]
    DuplicateEntry { path: String },

    #[error("Cannot derive an archive entry name for {}", path.display())]
    InvalidPath { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk bundle root: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Packaging task failed: {0}")]
    Task(String),
}
