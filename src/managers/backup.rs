//! Backup orchestrator - drives each job through its pipeline
//!
//! A job moves `Created -> Archived -> LocalRetained -> Uploaded -> RemoteRetained`.
//! Archive creation and upload failures abort the job. Retention failures in
//! either domain are only collected as warnings. Jobs are isolated, so one
//! aborted job never prevents the next from running.

use super::archive::ArchiveCreator;
use super::local_retention::LocalRetentionManager;
use super::remote_retention::RemoteRetentionManager;
use super::retention::RetentionWarning;
use crate::config::{self, BackupJob, Config, GlobalConfig};
use crate::error::BackupError;
use crate::utils::drive::DriveClient;
use crate::utils::{
    CommandExecutor, LocalArtifact, LocalFileOps, RealExecutor, RealFileOps, RemoteObject, RemoteStore,
};
use anyhow::{Context, Result};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Pipeline stage a job has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Archived,
    LocalRetained,
    Uploaded,
    RemoteRetained,
    Aborted,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Created => "created",
            JobState::Archived => "archived",
            JobState::LocalRetained => "local-retained",
            JobState::Uploaded => "uploaded",
            JobState::RemoteRetained => "remote-retained",
            JobState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Everything that happened to one job
#[derive(Debug)]
pub struct JobReport {
    pub job: String,
    pub state: JobState,
    /// Last state reached before the job aborted
    pub failed_after: Option<JobState>,
    /// The artifact that survived local retention
    pub artifact: Option<LocalArtifact>,
    pub uploaded: Option<RemoteObject>,
    /// The object remote retention kept
    pub remote_kept: Option<RemoteObject>,
    pub warnings: Vec<RetentionWarning>,
    pub error: Option<BackupError>,
    pub duration: Duration,
}

impl JobReport {
    fn new(job: &str) -> Self {
        Self {
            job: job.to_string(),
            state: JobState::Created,
            failed_after: None,
            artifact: None,
            uploaded: None,
            remote_kept: None,
            warnings: Vec::new(),
            error: None,
            duration: Duration::ZERO,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == JobState::RemoteRetained
    }

    fn advance(&mut self, state: JobState) {
        info!("Job '{}': {} -> {}", self.job, self.state, state);
        self.state = state;
    }

    fn abort(mut self, err: BackupError, started: Instant) -> Self {
        error!("Job '{}' aborted after {}: {}", self.job, self.state, err);
        self.failed_after = Some(self.state);
        self.state = JobState::Aborted;
        self.error = Some(err);
        self.duration = started.elapsed();
        self
    }
}

/// Outcome of a full run over all configured jobs
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Reports of the jobs that ran, in configuration order
    pub reports: Vec<JobReport>,
    /// Names of disabled jobs
    pub skipped: Vec<String>,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.reports.iter().all(JobReport::succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobReport> {
        self.reports.iter().filter(|r| !r.succeeded())
    }

    pub fn warning_count(&self) -> usize {
        self.reports.iter().map(|r| r.warnings.len()).sum()
    }

    pub fn report(&self, job: &str) -> Option<&JobReport> {
        self.reports.iter().find(|r| r.job == job)
    }
}

/// Settings the orchestrator takes from `[global]`
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub use_sudo: bool,
    pub command_timeout: Option<Duration>,
    pub remote_settle_delay: Duration,
}

impl OrchestratorSettings {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            use_sudo: global.use_sudo,
            command_timeout: global.command_timeout_seconds.map(Duration::from_secs),
            remote_settle_delay: Duration::from_secs(global.remote_settle_seconds),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            use_sudo: false,
            command_timeout: None,
            remote_settle_delay: Duration::ZERO,
        }
    }
}

pub struct BackupOrchestrator {
    jobs: Vec<BackupJob>,
    settings: OrchestratorSettings,
    executor: Box<dyn CommandExecutor>,
    files: Box<dyn LocalFileOps>,
    remote: Box<dyn RemoteStore>,
}

impl BackupOrchestrator {
    pub fn new(
        jobs: Vec<BackupJob>,
        settings: OrchestratorSettings,
        executor: Box<dyn CommandExecutor>,
        files: Box<dyn LocalFileOps>,
        remote: Box<dyn RemoteStore>,
    ) -> Self {
        Self {
            jobs,
            settings,
            executor,
            files,
            remote,
        }
    }

    /// Build an orchestrator backed by real processes, the local disk and Google Drive
    pub fn from_config(config: &Config) -> Result<Self> {
        let jobs = config::resolve_all_jobs(config).context("Failed to resolve jobs")?;
        let global = &config.global;

        let credentials = config::expand_tilde(&global.credentials_file);
        let drive = DriveClient::from_key_file(&credentials, global.upload_chunk_size_kb)
            .with_context(|| format!("Failed to load credentials from {:?}", credentials))?;

        Ok(Self::new(
            jobs,
            OrchestratorSettings::from_global(global),
            Box::new(RealExecutor::new()),
            Box::new(RealFileOps::elevated(global.use_sudo)),
            Box::new(drive),
        ))
    }

    pub fn jobs(&self) -> &[BackupJob] {
        &self.jobs
    }

    /// Run every enabled job in order
    pub fn run_all(&self) -> RunSummary {
        if self.settings.command_timeout.is_none() {
            warn!("No command_timeout_seconds configured; a hung backup command will block this run");
        }

        let mut summary = RunSummary::default();
        for job in &self.jobs {
            if !job.enabled {
                info!("Job '{}' is disabled, skipping", job.name);
                summary.skipped.push(job.name.clone());
                continue;
            }
            summary.reports.push(self.run_job(job));
        }

        info!(
            "Run finished: {} succeeded, {} failed, {} skipped, {} warning(s)",
            summary.reports.len() - summary.failed().count(),
            summary.failed().count(),
            summary.skipped.len(),
            summary.warning_count()
        );
        summary
    }

    /// Run a single job through the whole pipeline
    pub fn run_job(&self, job: &BackupJob) -> JobReport {
        let started = Instant::now();
        let mut report = JobReport::new(&job.name);
        info!("Starting backup job '{}' ({:?})", job.name, job.method_kind());

        // Archive
        let creator = ArchiveCreator::new(self.executor.as_ref(), self.files.as_ref())
            .with_sudo(self.settings.use_sudo)
            .with_timeout(self.settings.command_timeout);
        let created = match creator.create(job) {
            Ok(artifact) => artifact,
            Err(e) => return report.abort(e, started),
        };
        report.advance(JobState::Archived);

        // Local retention
        let local = LocalRetentionManager::new(self.files.as_ref());
        let artifact = match local.retain_latest(&job.local_directory, &job.pattern) {
            Ok(retained) => {
                if retained.kept.path != created.path {
                    warn!(
                        "Job '{}': {:?} is newer than the artifact just created ({:?})",
                        job.name, retained.kept.path, created.path
                    );
                }
                report.warnings.extend(retained.warnings);
                retained.kept
            }
            // The created artifact exists, so the job carries on with it
            Err(e) => {
                warn!("Job '{}': local retention failed: {}", job.name, e);
                report
                    .warnings
                    .push(RetentionWarning::new(job.local_directory.display().to_string(), e));
                created
            }
        };
        report.artifact = Some(artifact.clone());
        report.advance(JobState::LocalRetained);

        // Upload
        info!("Uploading {:?} to folder {}", artifact.path, job.remote_folder_id);
        let uploaded = match self.remote.upload(&job.remote_folder_id, &artifact.path) {
            Ok(object) => object,
            Err(e) => {
                let err = BackupError::UploadFailed {
                    path: artifact.path.clone(),
                    cause: format!("{:#}", e),
                };
                return report.abort(err, started);
            }
        };
        info!("Uploaded {} (ID: {})", uploaded.name, uploaded.id);
        report.uploaded = Some(uploaded.clone());
        report.advance(JobState::Uploaded);

        // Remote retention
        let remote = RemoteRetentionManager::new(self.remote.as_ref())
            .with_settle_delay(self.settings.remote_settle_delay);
        let outcome = remote.retain_latest(&job.remote_folder_id);
        if let Some(kept) = &outcome.kept {
            if kept.id != uploaded.id {
                warn!(
                    "Job '{}': remote retention kept {} instead of the fresh upload {}",
                    job.name, kept.id, uploaded.id
                );
            }
        }
        report.warnings.extend(outcome.warnings);
        report.remote_kept = outcome.kept;
        report.advance(JobState::RemoteRetained);

        report.duration = started.elapsed();
        if report.warnings.is_empty() {
            info!(
                "Job '{}' completed in {:.2}s",
                job.name,
                report.duration.as_secs_f64()
            );
        } else {
            warn!(
                "Job '{}' completed in {:.2}s with {} warning(s)",
                job.name,
                report.duration.as_secs_f64(),
                report.warnings.len()
            );
        }
        report
    }
}
