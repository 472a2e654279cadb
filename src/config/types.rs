use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub global: GlobalConfig,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Root directory for directory-archive outputs (one subdirectory per job)
    #[serde(default = "default_backup_root")]
    pub backup_root: PathBuf,

    /// Service-account JSON key used for the remote store
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// Run external commands and removals through sudo
    #[serde(default = "default_use_sudo")]
    pub use_sudo: bool,

    /// Seconds to wait after an upload before listing the remote folder
    #[serde(default = "default_remote_settle_seconds")]
    pub remote_settle_seconds: u64,

    /// Upper bound for any external command (unbounded when absent)
    #[serde(default)]
    pub command_timeout_seconds: Option<u64>,

    /// Size of each resumable upload chunk
    #[serde(default = "default_upload_chunk_size_kb")]
    pub upload_chunk_size_kb: u64,

    /// Logging configuration
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

/// How a job produces its archive
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackupMethod {
    /// A service-provided backup command writes the artifact itself
    ExternalCommand,
    /// A gzip-compressed tar archive is built from `source_paths`
    DirectoryArchive,
}

/// Job configuration (raw, before defaults are applied)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    pub name: String,

    pub method: BackupMethod,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Remote folder that receives this job's uploads
    pub remote_folder_id: String,

    /// Directories to archive (directory_archive only)
    #[serde(default)]
    pub source_paths: Vec<PathBuf>,

    /// Command line that produces the backup (external_command only)
    #[serde(default)]
    pub command: Vec<String>,

    /// Where artifacts for this job live locally
    #[serde(default)]
    pub local_directory: Option<PathBuf>,

    /// File name suffix identifying this job's artifacts
    #[serde(default)]
    pub artifact_suffix: Option<String>,
}

/// File-name convention for a job's artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPattern {
    pub prefix: String,
    pub suffix: String,
}

impl ArtifactPattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        file_name.len() >= self.prefix.len() + self.suffix.len()
            && file_name.starts_with(&self.prefix)
            && file_name.ends_with(&self.suffix)
    }
}

impl std::fmt::Display for ArtifactPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*{}", self.prefix, self.suffix)
    }
}

/// Method-specific settings of a resolved job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveMethod {
    ExternalCommand { command: Vec<String> },
    DirectoryArchive { source_paths: Vec<PathBuf> },
}

/// Resolved backup job (after defaults are applied)
#[derive(Debug, Clone)]
pub struct BackupJob {
    pub name: String,
    pub enabled: bool,
    pub method: ArchiveMethod,
    pub remote_folder_id: String,
    pub local_directory: PathBuf,
    pub pattern: ArtifactPattern,
}

impl BackupJob {
    pub fn method_kind(&self) -> BackupMethod {
        match self.method {
            ArchiveMethod::ExternalCommand { .. } => BackupMethod::ExternalCommand,
            ArchiveMethod::DirectoryArchive { .. } => BackupMethod::DirectoryArchive,
        }
    }

    /// Configured source paths; empty for external-command jobs
    pub fn source_paths(&self) -> &[PathBuf] {
        match &self.method {
            ArchiveMethod::DirectoryArchive { source_paths } => source_paths,
            ArchiveMethod::ExternalCommand { .. } => &[],
        }
    }
}

// Default value functions

fn default_backup_root() -> PathBuf { PathBuf::from("/var/backups") }
fn default_credentials_file() -> PathBuf { PathBuf::from("cred.json") }
fn default_use_sudo() -> bool { true }
fn default_remote_settle_seconds() -> u64 { 5 }
fn default_upload_chunk_size_kb() -> u64 { 1024 }
fn default_log_directory() -> PathBuf { PathBuf::from("~/logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_enabled() -> bool { true }
