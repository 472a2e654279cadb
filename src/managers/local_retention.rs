//! Local retention - keep only the newest artifact in a job's directory

use super::retention::{self, RetentionDomain, RetentionWarning};
use crate::config::ArtifactPattern;
use crate::error::{BackupError, Result};
use crate::utils::{LocalArtifact, LocalFileOps};
use std::path::Path;

/// Outcome of local retention; unlike the remote side there is always a winner
#[derive(Debug, Clone)]
pub struct LocalRetention {
    pub kept: LocalArtifact,
    pub removed: Vec<LocalArtifact>,
    pub warnings: Vec<RetentionWarning>,
}

pub struct LocalRetentionManager<'a> {
    files: &'a dyn LocalFileOps,
}

struct LocalDomain<'a> {
    files: &'a dyn LocalFileOps,
    pattern: &'a ArtifactPattern,
}

impl RetentionDomain for LocalDomain<'_> {
    type Scope = Path;
    type Item = LocalArtifact;

    fn list(&self, directory: &Path) -> anyhow::Result<Vec<LocalArtifact>> {
        self.files.list_artifacts(directory, self.pattern)
    }

    fn delete(&self, item: &LocalArtifact) -> anyhow::Result<()> {
        self.files.remove(&item.path)
    }
}

impl<'a> LocalRetentionManager<'a> {
    pub fn new(files: &'a dyn LocalFileOps) -> Self {
        Self { files }
    }

    /// Keep the newest file in `directory` matching `pattern`, remove the others
    ///
    /// Fails only when nothing matches or the directory cannot be listed.
    pub fn retain_latest(&self, directory: &Path, pattern: &ArtifactPattern) -> Result<LocalRetention> {
        let domain = LocalDomain {
            files: self.files,
            pattern,
        };

        let outcome = retention::retain_latest(&domain, directory).map_err(|e| {
            BackupError::ListingFailed {
                location: directory.display().to_string(),
                cause: format!("{:#}", e),
            }
        })?;

        let kept = outcome.kept.ok_or_else(|| BackupError::NoArtifactFound {
            directory: directory.to_path_buf(),
            pattern: pattern.to_string(),
        })?;

        Ok(LocalRetention {
            kept,
            removed: outcome.removed,
            warnings: outcome.warnings,
        })
    }
}
