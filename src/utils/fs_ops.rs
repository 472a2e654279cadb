//! Local filesystem operations used by archive creation and local retention
//!
//! Like the command executor, this is a trait so retention can be exercised
//! against files with chosen timestamps and removals that fail.

use crate::config::ArtifactPattern;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A backup file on local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

pub trait LocalFileOps: Send + Sync {
    /// Files directly inside `directory` whose name matches `pattern`
    fn list_artifacts(&self, directory: &Path, pattern: &ArtifactPattern) -> Result<Vec<LocalArtifact>>;

    /// Remove a single file
    fn remove(&self, path: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Create a directory and any missing parents
    fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// Filesystem access through `std::fs`
#[derive(Debug, Clone, Default)]
pub struct RealFileOps {
    use_sudo: bool,
}

impl RealFileOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove files with `sudo rm` (artifacts written by elevated tools are root-owned)
    pub fn elevated(use_sudo: bool) -> Self {
        Self { use_sudo }
    }
}

/// Birth time where the platform reports it, modification time otherwise
fn creation_time(metadata: &fs::Metadata) -> std::io::Result<DateTime<Utc>> {
    let time = metadata.created().or_else(|_| metadata.modified())?;
    Ok(DateTime::<Utc>::from(time))
}

impl LocalFileOps for RealFileOps {
    fn list_artifacts(&self, directory: &Path, pattern: &ArtifactPattern) -> Result<Vec<LocalArtifact>> {
        let entries = fs::read_dir(directory)
            .with_context(|| format!("Failed to read directory {:?}", directory))?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("Failed to read entry in {:?}", directory))?;
            let name = entry.file_name();
            if !pattern.matches(&name.to_string_lossy()) {
                continue;
            }

            let metadata = entry
                .metadata()
                .with_context(|| format!("Failed to stat {:?}", entry.path()))?;
            if !metadata.is_file() {
                continue;
            }

            artifacts.push(LocalArtifact {
                path: entry.path(),
                created_at: creation_time(&metadata)
                    .with_context(|| format!("No timestamp for {:?}", entry.path()))?,
            });
        }

        debug!(
            "Found {} file(s) matching '{}' in {:?}",
            artifacts.len(),
            pattern,
            directory
        );
        Ok(artifacts)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        if self.use_sudo {
            let path_str = path.display().to_string();
            super::command::run_command("sudo", &["rm", "-f", "--", &path_str], None)
                .with_context(|| format!("sudo rm failed for {:?}", path))?;
            return Ok(());
        }

        fs::remove_file(path).with_context(|| format!("Failed to remove {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        match fs::create_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if self.use_sudo && e.kind() == std::io::ErrorKind::PermissionDenied => {
                debug!("Creating {:?} with sudo", path);
                let path_str = path.display().to_string();
                super::command::run_command("sudo", &["mkdir", "-p", "--", &path_str], None)
                    .with_context(|| format!("sudo mkdir failed for {:?}", path))?;
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to create directory {:?}", path)),
        }
    }
}

/// In-memory filesystem for tests
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::{Arc, Mutex};

    /// In-memory file tree with controllable timestamps and failing removals
    #[derive(Clone, Default)]
    pub struct MockFileOps {
        files: Arc<Mutex<BTreeMap<PathBuf, DateTime<Utc>>>>,
        directories: Arc<Mutex<HashSet<PathBuf>>>,
        failing_removals: Arc<Mutex<HashSet<PathBuf>>>,
        /// Paths passed to `remove`, in call order
        pub removals: Arc<Mutex<Vec<PathBuf>>>,
        /// Listings that succeed before every further listing fails; `None` never fails
        listings_before_failure: Arc<Mutex<Option<usize>>>,
    }

    impl MockFileOps {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a file with the given creation time
        pub fn with_file(self, path: impl Into<PathBuf>, created_at: DateTime<Utc>) -> Self {
            self.add_file(path, created_at);
            self
        }

        /// Mark a directory as existing
        pub fn with_directory(self, path: impl Into<PathBuf>) -> Self {
            self.directories.lock().unwrap().insert(path.into());
            self
        }

        /// Make removal of `path` fail with a permission error
        pub fn with_failing_removal(self, path: impl Into<PathBuf>) -> Self {
            self.failing_removals.lock().unwrap().insert(path.into());
            self
        }

        /// Make every listing fail
        pub fn with_failing_listing(self) -> Self {
            self.with_failing_listing_after(0)
        }

        /// Let `successes` listings through, then fail every later one
        pub fn with_failing_listing_after(self, successes: usize) -> Self {
            *self.listings_before_failure.lock().unwrap() = Some(successes);
            self
        }

        pub fn add_file(&self, path: impl Into<PathBuf>, created_at: DateTime<Utc>) {
            self.files.lock().unwrap().insert(path.into(), created_at);
        }

        /// Paths of all files currently present, sorted
        pub fn files(&self) -> Vec<PathBuf> {
            self.files.lock().unwrap().keys().cloned().collect()
        }

        pub fn get_removals(&self) -> Vec<PathBuf> {
            self.removals.lock().unwrap().clone()
        }
    }

    impl LocalFileOps for MockFileOps {
        fn list_artifacts(&self, directory: &Path, pattern: &ArtifactPattern) -> Result<Vec<LocalArtifact>> {
            {
                let mut remaining = self.listings_before_failure.lock().unwrap();
                match remaining.as_mut() {
                    Some(0) => anyhow::bail!("Mock listing failure for {:?}", directory),
                    Some(n) => *n -= 1,
                    None => {}
                }
            }
            Ok(self
                .files
                .lock()
                .unwrap()
                .iter()
                .filter(|(path, _)| path.parent() == Some(directory))
                .filter(|(path, _)| {
                    path.file_name()
                        .map(|n| pattern.matches(&n.to_string_lossy()))
                        .unwrap_or(false)
                })
                .map(|(path, created_at)| LocalArtifact {
                    path: path.clone(),
                    created_at: *created_at,
                })
                .collect())
        }

        fn remove(&self, path: &Path) -> Result<()> {
            self.removals.lock().unwrap().push(path.to_path_buf());
            if self.failing_removals.lock().unwrap().contains(path) {
                anyhow::bail!("Permission denied (os error 13): {:?}", path);
            }
            if self.files.lock().unwrap().remove(path).is_none() {
                anyhow::bail!("No such file or directory (os error 2): {:?}", path);
            }
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.lock().unwrap().contains_key(path)
                || self.directories.lock().unwrap().contains(path)
        }

        fn create_dir_all(&self, path: &Path) -> Result<()> {
            let mut directories = self.directories.lock().unwrap();
            for ancestor in path.ancestors() {
                directories.insert(ancestor.to_path_buf());
            }
            Ok(())
        }
    }
}
