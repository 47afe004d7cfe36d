//! Local staging layout for bundles and the repositories they are built from

use std::path::{Path, PathBuf};
use tracing::{debug, info};

const STAGING_DIR: &str = "centralPortalPublishing";

/// Remove `dir` with everything in it and recreate it empty.
///
/// Artifacts left over from an earlier publish would otherwise end up in the
/// next bundle.
pub async fn clear_repository(dir: &Path) -> std::io::Result<()> {
    if tokio::fs::try_exists(dir).await? {
        debug!("Removing staging repository {}", dir.display());
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await?;
    info!("Cleared staging repository {}", dir.display());
    Ok(())
}

/// Combine a `:`-separated project path and a bundle name into one
/// camel-case identifier, e.g. `:lib:core` + `main` -> `libCoreMain`.
pub fn qualified_bundle_name(project_path: &str, name: &str) -> String {
    let mut qualified = String::new();
    for part in project_path.split(':').filter(|p| !p.is_empty()) {
        if qualified.is_empty() {
            qualified.push_str(part);
        } else {
            qualified.push_str(&capitalize(part));
        }
    }

    if qualified.is_empty() {
        name.to_string()
    } else {
        qualified.push_str(&capitalize(name));
        qualified
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Where bundles and staging repositories live under a build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    build_dir: PathBuf,
}

impl BundleLayout {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn bundles_dir(&self) -> PathBuf {
        self.build_dir.join(STAGING_DIR).join("bundles")
    }

    pub fn bundle_path(&self, name: &str) -> PathBuf {
        self.bundles_dir().join(format!("{name}.zip"))
    }

    pub fn repository_dir(&self, project_path: &str, name: &str) -> PathBuf {
        self.build_dir
            .join(STAGING_DIR)
            .join("repositories")
            .join(qualified_bundle_name(project_path, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_qualified_bundle_names() {
        assert_eq!(qualified_bundle_name(":", "main"), "main");
        assert_eq!(qualified_bundle_name("", "main"), "main");
        assert_eq!(qualified_bundle_name(":lib", "main"), "libMain");
        assert_eq!(qualified_bundle_name(":lib:core", "main"), "libCoreMain");
        assert_eq!(qualified_bundle_name("::lib::core:", "release"), "libCoreRelease");
    }

    #[test]
    fn test_layout_paths() {
        let layout = BundleLayout::new("build");
        assert_eq!(
            layout.bundle_path("main"),
            Path::new("build/centralPortalPublishing/bundles/main.zip")
        );
        assert_eq!(
            layout.repository_dir(":lib", "main"),
            Path::new("build/centralPortalPublishing/repositories/libMain")
        );
    }

    #[tokio::test]
    async fn test_clear_repository_removes_contents() {
        let temp = tempdir().unwrap();
        let repo = temp.path().join("repo");
        std::fs::create_dir_all(repo.join("com/example/1.0")).unwrap();
        std::fs::write(repo.join("com/example/1.0/lib.jar"), "old").unwrap();

        tokio_test::assert_ok!(clear_repository(&repo).await);

        assert!(repo.is_dir());
        assert_eq!(std::fs::read_dir(&repo).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_clear_repository_creates_missing_directory() {
        let temp = tempdir().unwrap();
        let repo = temp.path().join("nested").join("repo");

        tokio_test::assert_ok!(clear_repository(&repo).await);

        assert!(repo.is_dir());
    }
}
