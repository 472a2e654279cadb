use super::expand_tilde;
use super::types::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Job '{job}': {reason}")]
    InvalidJob { job: String, reason: String },

    #[error("Job '{0}' is defined more than once")]
    DuplicateJob(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Extension of every directory archive
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if !expand_tilde(&config.global.credentials_file).exists() {
        return Err(ConfigError::ValidationError(format!(
            "Credentials file does not exist: {:?}",
            config.global.credentials_file
        )));
    }

    if config.global.upload_chunk_size_kb == 0 {
        return Err(ConfigError::ValidationError(
            "upload_chunk_size_kb must be greater than zero".to_string(),
        ));
    }

    if config.jobs.is_empty() {
        return Err(ConfigError::ValidationError("No jobs defined".to_string()));
    }

    let mut seen = HashSet::new();
    for job in &config.jobs {
        validate_job(job)?;
        if !seen.insert(job.name.as_str()) {
            return Err(ConfigError::DuplicateJob(job.name.clone()));
        }
    }

    Ok(())
}

fn validate_job(job: &JobConfig) -> Result<()> {
    let invalid = |reason: &str| ConfigError::InvalidJob {
        job: job.name.clone(),
        reason: reason.to_string(),
    };

    if job.name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Job name must not be empty".to_string(),
        ));
    }

    // Names end up in file names and directory paths
    if job.name.contains(['/', '\\']) {
        return Err(invalid("name must not contain path separators"));
    }

    if job.remote_folder_id.trim().is_empty() {
        return Err(invalid("remote_folder_id must not be empty"));
    }

    match job.method {
        BackupMethod::DirectoryArchive => {
            if job.source_paths.is_empty() {
                return Err(invalid("directory_archive requires at least one source path"));
            }
            // Archive names are always <name>_backup_<timestamp>.tar.gz
            if job.artifact_suffix.is_some() {
                return Err(invalid("artifact_suffix is only supported for external_command"));
            }
        }
        BackupMethod::ExternalCommand => {
            if job.command.first().map_or(true, |p| p.trim().is_empty()) {
                return Err(invalid("external_command requires a command"));
            }
        }
    }

    if let Some(ref suffix) = job.artifact_suffix {
        if suffix.is_empty() {
            return Err(invalid("artifact_suffix must not be empty"));
        }
    }

    Ok(())
}

/// Resolve a job configuration by applying global defaults
pub fn resolve_job(job: &JobConfig, global: &GlobalConfig) -> Result<BackupJob> {
    validate_job(job)?;

    let (method, local_directory, pattern) = match job.method {
        BackupMethod::ExternalCommand => {
            let directory = job
                .local_directory
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("/var/opt/{}/backups", job.name)));
            let suffix = job
                .artifact_suffix
                .clone()
                .unwrap_or_else(|| format!("_{}_backup.tar", job.name));
            (
                ArchiveMethod::ExternalCommand {
                    command: job.command.clone(),
                },
                directory,
                ArtifactPattern::new("", suffix),
            )
        }
        BackupMethod::DirectoryArchive => {
            let directory = job
                .local_directory
                .clone()
                .unwrap_or_else(|| global.backup_root.join(&job.name));
            (
                ArchiveMethod::DirectoryArchive {
                    source_paths: job.source_paths.clone(),
                },
                directory,
                ArtifactPattern::new(format!("{}_backup_", job.name), ARCHIVE_SUFFIX),
            )
        }
    };

    Ok(BackupJob {
        name: job.name.clone(),
        enabled: job.enabled,
        method,
        remote_folder_id: job.remote_folder_id.clone(),
        local_directory,
        pattern,
    })
}

/// Resolve all jobs in configuration order
pub fn resolve_all_jobs(config: &Config) -> Result<Vec<BackupJob>> {
    config
        .jobs
        .iter()
        .map(|job| resolve_job(job, &config.global))
        .collect()
}
