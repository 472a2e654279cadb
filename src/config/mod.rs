//! Configuration module for drive-backup
//!
//! This module handles loading, validating, and resolving configuration from TOML files.
//!
//! Jobs are declared as an ordered `[[jobs]]` array and run in that order.
//! Resolution fills in per-method defaults:
//! - `external_command`: artifacts are looked up in `/var/opt/<name>/backups`
//!   by the suffix `_<name>_backup.tar`
//! - `directory_archive`: archives are written to `<backup_root>/<name>` as
//!   `<name>_backup_<timestamp>.tar.gz`; `artifact_suffix` is rejected for
//!   these jobs
//!
//! Paths starting with `~` (`credentials_file`, `log_directory`) are expanded
//! against the invoking user's home directory.
//!
//! ## Elevation
//!
//! `use_sudo` defaults to `true`: backup commands, `tar`, permission fix-ups
//! and local removals run through `sudo`. Set `use_sudo = false` in `[global]`
//! when the process already has the access it needs.
//!
//! ## Example Usage
//!
//! ```no_run
//! use drive_backup::config;
//!
//! let config = config::load_config("config.toml")?;
//! let jobs = config::resolve_all_jobs(&config)?;
//!
//! for job in jobs {
//!     println!("Job: {}, folder: {}", job.name, job.remote_folder_id);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, resolve_all_jobs, resolve_job, ConfigError, Result, ARCHIVE_SUFFIX};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
