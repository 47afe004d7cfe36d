//! Packs the contents of one or more staging roots into a single ZIP bundle

use crate::archive::PackagingError;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, ErrorKind};
use std::path::{Component, Path, PathBuf};
use tokio::task;
use tracing::{debug, info, trace};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const METADATA_FILE_NAME: &str = "maven-metadata.xml";
#[cfg(unix)]
const BUNDLE_MODE: u32 = 0o644;

/// Repository metadata and its checksum/signature sidecars are generated by
/// the portal itself and must not be part of an uploaded bundle.
pub fn is_metadata_file(file_name: &str) -> bool {
    match file_name.strip_prefix(METADATA_FILE_NAME) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    pub output: PathBuf,
    /// Entry names in the order they were written.
    pub entries: Vec<String>,
    /// Number of metadata files left out of the archive.
    pub excluded: usize,
}

#[derive(Debug)]
struct SourceEntry {
    path: PathBuf,
    name: String,
}

pub struct BundlePackager {
    roots: Vec<PathBuf>,
}

impl BundlePackager {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the bundle at `output`, replacing any previous file there.
    pub async fn package(&self, output: &Path) -> Result<PackageSummary, PackagingError> {
        let roots = self.roots.clone();
        let output = output.to_path_buf();

        task::spawn_blocking(move || Self::package_sync(&roots, &output))
            .await
            .map_err(|e| PackagingError::Task(format!("Task join error: {e}")))?
    }

    pub fn package_sync(roots: &[PathBuf], output: &Path) -> Result<PackageSummary, PackagingError> {
        prepare_output(output)?;

        let (sources, excluded) = collect_sources(roots)?;
        write_archive(&sources, output)?;

        info!(
            "Packaged {} entries into {} ({} metadata files excluded)",
            sources.len(),
            output.display(),
            excluded
        );

        Ok(PackageSummary {
            output: output.to_path_buf(),
            entries: sources.into_iter().map(|s| s.name).collect(),
            excluded,
        })
    }
}

fn prepare_output(output: &Path) -> Result<(), PackagingError> {
    match std::fs::remove_file(output) {
        Ok(()) => debug!("Removed previous bundle at {}", output.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if let Some(parent) = output_dir(output) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn output_dir(output: &Path) -> Option<&Path> {
    output.parent().filter(|p| !p.as_os_str().is_empty())
}

fn collect_sources(roots: &[PathBuf]) -> Result<(Vec<SourceEntry>, usize), PackagingError> {
    let mut written = BTreeSet::new();
    let mut sources = Vec::new();
    let mut excluded = 0;

    for root in roots {
        if !root.exists() {
            debug!("Skipping missing bundle root: {}", root.display());
            continue;
        }

        let walker = WalkDir::new(root).follow_links(true).sort_by_file_name();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            if is_metadata_file(&entry.file_name().to_string_lossy()) {
                trace!("Excluding metadata file {}", entry.path().display());
                excluded += 1;
                continue;
            }

            let name = entry_name(root, entry.path())?;
            if !written.insert(name.clone()) {
                return Err(PackagingError::DuplicateEntry { path: name });
            }

            sources.push(SourceEntry {
                path: entry.into_path(),
                name,
            });
        }
    }

    Ok((sources, excluded))
}

/// Root-relative, `/`-separated entry name. A root that is itself a file is
/// named by its file name.
fn entry_name(root: &Path, path: &Path) -> Result<String, PackagingError> {
    let invalid = || PackagingError::InvalidPath {
        path: path.to_path_buf(),
    };

    let relative = match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative,
        _ => Path::new(path.file_name().ok_or_else(invalid)?),
    };

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(invalid)?),
            _ => return Err(invalid()),
        }
    }

    Ok(parts.join("/"))
}

fn write_archive(sources: &[SourceEntry], output: &Path) -> Result<(), PackagingError> {
    // Written next to the destination so the final rename stays on one filesystem.
    let temp = tempfile::NamedTempFile::new_in(output_dir(output).unwrap_or(Path::new(".")))?;
    let mut zip = ZipWriter::new(BufWriter::new(temp));

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    for source in sources {
        trace!("Adding {} as {}", source.path.display(), source.name);
        zip.start_file(source.name.as_str(), options)?;

        let mut file = File::open(&source.path).map_err(|e| PackagingError::ReadSource {
            path: source.path.clone(),
            source: e,
        })?;
        std::io::copy(&mut file, &mut zip).map_err(|e| PackagingError::ReadSource {
            path: source.path.clone(),
            source: e,
        })?;
    }

    let temp = zip.finish()?.into_inner().map_err(|e| e.into_error())?;
    // Temp files are created owner-only.
    set_bundle_permissions(temp.path())?;
    temp.persist(output).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn set_bundle_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(BUNDLE_MODE))
}

#[cfg(not(unix))]
fn set_bundle_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
