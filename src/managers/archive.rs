//! Archive creation - produce a fresh local artifact for a job

use super::retention::select_latest;
use crate::config::{ArchiveMethod, BackupJob, ARCHIVE_SUFFIX};
use crate::error::{BackupError, Result};
use crate::utils::command::elevated;
use crate::utils::{CommandExecutor, LocalArtifact, LocalFileOps};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// File name of a directory archive created at `timestamp`
pub fn archive_file_name(job_name: &str, timestamp: DateTime<Local>) -> String {
    format!(
        "{}_backup_{}{}",
        job_name,
        timestamp.format("%Y-%m-%d_%H-%M-%S"),
        ARCHIVE_SUFFIX
    )
}

pub struct ArchiveCreator<'a> {
    executor: &'a dyn CommandExecutor,
    files: &'a dyn LocalFileOps,
    use_sudo: bool,
    timeout: Option<Duration>,
}

impl<'a> ArchiveCreator<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, files: &'a dyn LocalFileOps) -> Self {
        Self {
            executor,
            files,
            use_sudo: false,
            timeout: None,
        }
    }

    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Produce a new artifact for `job` and return it
    pub fn create(&self, job: &BackupJob) -> Result<LocalArtifact> {
        match &job.method {
            ArchiveMethod::ExternalCommand { command } => self.run_external_command(job, command),
            ArchiveMethod::DirectoryArchive { source_paths } => {
                self.create_directory_archive(job, source_paths)
            }
        }
    }

    /// Run the service's own backup tool, then pick up what it wrote
    fn run_external_command(&self, job: &BackupJob, command: &[String]) -> Result<LocalArtifact> {
        let (program, args) = command.split_first().ok_or_else(|| BackupError::InvalidJob {
            job: job.name.clone(),
            reason: "command is empty".to_string(),
        })?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        info!("Running backup command for '{}': {}", job.name, command.join(" "));
        let (program, args) = elevated(self.use_sudo, program, &args);
        self.executor.run_command(program, &args, self.timeout)?;

        let artifacts = self
            .files
            .list_artifacts(&job.local_directory, &job.pattern)
            .map_err(|e| BackupError::ListingFailed {
                location: job.local_directory.display().to_string(),
                cause: format!("{:#}", e),
            })?;

        let newest = select_latest(&artifacts).ok_or_else(|| BackupError::NoArtifactFound {
            directory: job.local_directory.clone(),
            pattern: job.pattern.to_string(),
        })?;

        let artifact = artifacts[newest].clone();
        info!("Backup command produced {:?}", artifact.path);
        Ok(artifact)
    }

    /// Build `<dir>/<name>_backup_<timestamp>.tar.gz` from the sources that exist
    fn create_directory_archive(&self, job: &BackupJob, source_paths: &[PathBuf]) -> Result<LocalArtifact> {
        let sources: Vec<&PathBuf> = source_paths
            .iter()
            .filter(|path| {
                let exists = self.files.exists(path);
                if !exists {
                    warn!("Source path {:?} for '{}' does not exist, skipping", path, job.name);
                }
                exists
            })
            .collect();

        if sources.is_empty() {
            return Err(BackupError::NoValidSources {
                job: job.name.clone(),
            });
        }

        self.files
            .create_dir_all(&job.local_directory)
            .map_err(|e| BackupError::Io(std::io::Error::other(format!("{:#}", e))))?;
        self.fix_permissions("755", &job.local_directory);

        let archive = job
            .local_directory
            .join(archive_file_name(&job.name, Local::now()));
        let archive_str = archive.display().to_string();

        let mut tar_args = vec!["-czf", archive_str.as_str()];
        let source_strs: Vec<String> = sources.iter().map(|p| p.display().to_string()).collect();
        tar_args.extend(source_strs.iter().map(String::as_str));

        info!("Creating archive {:?} from {} source(s)", archive, sources.len());
        let (program, args) = elevated(self.use_sudo, "tar", &tar_args);
        self.executor.run_command(program, &args, self.timeout)?;

        let artifact = self.find_artifact(job, &archive)?;
        self.fix_permissions("644", &archive);

        info!("Archive created: {:?}", artifact.path);
        Ok(artifact)
    }

    fn find_artifact(&self, job: &BackupJob, archive: &Path) -> Result<LocalArtifact> {
        let listed = self
            .files
            .list_artifacts(&job.local_directory, &job.pattern)
            .map_err(|e| BackupError::ListingFailed {
                location: job.local_directory.display().to_string(),
                cause: format!("{:#}", e),
            })?;

        listed
            .into_iter()
            .find(|a| a.path == archive)
            .ok_or_else(|| BackupError::NoArtifactFound {
                directory: job.local_directory.clone(),
                pattern: job.pattern.to_string(),
            })
    }

    /// Make root-written outputs readable by the invoking user; failure is not fatal
    fn fix_permissions(&self, mode: &str, path: &Path) {
        if !self.use_sudo {
            return;
        }
        let path_str = path.display().to_string();
        let (program, args) = elevated(true, "chmod", &[mode, &path_str]);
        match self.executor.run_command(program, &args, self.timeout) {
            Ok(_) => debug!("Set mode {} on {:?}", mode, path),
            Err(e) => warn!("Failed to set mode {} on {:?}: {}", mode, path, e),
        }
    }
}
