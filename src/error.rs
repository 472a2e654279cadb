//! Errors that end a backup job

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("{program} failed with exit code {}: {stderr}", display_code(.exit_code))]
    ExternalCommandFailed {
        program: String,
        /// `None` when the process was terminated by a signal
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {timeout:?}")]
    CommandTimedOut { program: String, timeout: Duration },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list {location}: {cause}")]
    ListingFailed { location: String, cause: String },

    #[error("No artifact matching '{pattern}' found in {directory:?}")]
    NoArtifactFound { directory: PathBuf, pattern: String },

    #[error("None of the source paths for '{job}' exist")]
    NoValidSources { job: String },

    #[error("Upload of {path:?} failed: {cause}")]
    UploadFailed { path: PathBuf, cause: String },

    #[error("Invalid job '{job}': {reason}")]
    InvalidJob { job: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// Exit code of a failed external command, if that is what happened
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BackupError::ExternalCommandFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

pub type Result<T> = std::result::Result<T, BackupError>;
