//! Drive Backup Library
//!
//! Creates local backup archives for configured services, keeps only the
//! newest one locally, uploads it to a Google Drive folder and prunes that
//! folder down to its newest object.

pub mod config;
pub mod error;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, resolve_all_jobs, BackupJob, Config};
pub use error::BackupError;
pub use managers::backup::{BackupOrchestrator, JobReport, JobState, OrchestratorSettings, RunSummary};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::retention::RetentionWarning;
