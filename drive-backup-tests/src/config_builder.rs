//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.
//! Every path the configuration points at lives inside the builder's temp dir.

use drive_backup::config::{BackupMethod, Config, GlobalConfig, JobConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    global: GlobalConfig,
    jobs: Vec<JobConfig>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with minimal defaults and no jobs
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let credentials_file = temp_dir.path().join("cred.json");
        fs::write(&credentials_file, crate::fixtures::service_account_json())
            .expect("Failed to write credentials file");

        let backup_root = temp_dir.path().join("backups");
        fs::create_dir_all(&backup_root).expect("Failed to create backup_root");

        let log_directory = temp_dir.path().join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log_directory");

        let global = GlobalConfig {
            backup_root,
            credentials_file,
            use_sudo: false,
            remote_settle_seconds: 0,
            command_timeout_seconds: None,
            upload_chunk_size_kb: 1024,
            log_directory,
            log_level: "debug".to_string(),
            log_max_files: 5,
        };

        Self {
            temp_dir,
            global,
            jobs: Vec::new(),
        }
    }

    /// A config with one external-command job
    pub fn minimal() -> Self {
        Self::new().add_external_command_job("gitlab", crate::fixtures::GITLAB_FOLDER_ID, &["gitlab-backup", "create"])
    }

    /// The two-job deployment: a gitlab external command plus a jenkins home archive
    pub fn gitlab_and_jenkins() -> Self {
        let builder = Self::minimal();
        let jenkins_home = builder.temp_dir().join("jenkins_home");
        fs::create_dir_all(&jenkins_home).expect("Failed to create jenkins home");
        fs::write(jenkins_home.join("config.xml"), "<hudson/>").expect("Failed to write jenkins config");

        builder.add_directory_archive_job("jenkins", crate::fixtures::JENKINS_FOLDER_ID, vec![jenkins_home])
    }

    /// Elevate commands and removals
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.global.use_sudo = use_sudo;
        self
    }

    /// Bound external commands
    pub fn with_command_timeout(mut self, seconds: u64) -> Self {
        self.global.command_timeout_seconds = Some(seconds);
        self
    }

    pub fn with_settle_seconds(mut self, seconds: u64) -> Self {
        self.global.remote_settle_seconds = seconds;
        self
    }

    pub fn with_credentials_file(mut self, path: &Path) -> Self {
        self.global.credentials_file = path.to_path_buf();
        self
    }

    /// Add a job whose artifacts land in `<temp>/<name>/backups`
    pub fn add_external_command_job(mut self, name: &str, folder_id: &str, command: &[&str]) -> Self {
        let local_directory = self.temp_dir.path().join(name).join("backups");
        fs::create_dir_all(&local_directory).expect("Failed to create job directory");

        self.jobs.push(JobConfig {
            name: name.to_string(),
            method: BackupMethod::ExternalCommand,
            enabled: true,
            remote_folder_id: folder_id.to_string(),
            source_paths: vec![],
            command: command.iter().map(|s| s.to_string()).collect(),
            local_directory: Some(local_directory),
            artifact_suffix: None,
        });
        self
    }

    /// Add a job archiving `sources` into `<backup_root>/<name>`
    pub fn add_directory_archive_job(mut self, name: &str, folder_id: &str, sources: Vec<PathBuf>) -> Self {
        self.jobs.push(JobConfig {
            name: name.to_string(),
            method: BackupMethod::DirectoryArchive,
            enabled: true,
            remote_folder_id: folder_id.to_string(),
            source_paths: sources,
            command: vec![],
            local_directory: None,
            artifact_suffix: None,
        });
        self
    }

    /// Add a job with full configuration
    pub fn add_job_config(mut self, job: JobConfig) -> Self {
        self.jobs.push(job);
        self
    }

    /// Mark an already added job as disabled
    pub fn disable_job(mut self, name: &str) -> Self {
        for job in self.jobs.iter_mut().filter(|j| j.name == name) {
            job.enabled = false;
        }
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn credentials_file(&self) -> &Path {
        &self.global.credentials_file
    }

    pub fn backup_root(&self) -> &Path {
        &self.global.backup_root
    }

    /// Build the Config
    pub fn build(self) -> Config {
        self.persist().0
    }

    /// Keep the temp directory (don't delete on drop)
    pub fn persist(self) -> (Config, TempDir) {
        let config = Config {
            global: self.global,
            jobs: self.jobs,
        };
        (config, self.temp_dir)
    }

    /// Serialize to `<temp>/config.toml` and return the config, its path and the temp dir
    pub fn write(self) -> (Config, PathBuf, TempDir) {
        let (config, temp_dir) = self.persist();
        let path = temp_dir.path().join("config.toml");
        let contents = toml::to_string_pretty(&config).expect("Failed to serialize config");
        fs::write(&path, contents).expect("Failed to write config file");
        (config, path, temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
