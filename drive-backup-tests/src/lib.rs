//! Test utilities for drive-backup
//!
//! This crate provides shared test utilities, mock implementations,
//! and helper functions for testing the drive-backup application.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockExecutor, MockRemoteStore, RealFileOps, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::from_builder(ConfigBuilder::gitlab_and_jenkins());
//!     let orchestrator = ctx.orchestrator(MockExecutor::new(), RealFileOps::new(), MockRemoteStore::new());
//!     let summary = orchestrator.run_all();
//!     // ... assertions
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{OptionAssertions, ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use drive_backup::config::{ArtifactPattern, BackupJob, BackupMethod, Config, GlobalConfig, JobConfig};
pub use drive_backup::error::BackupError;
pub use drive_backup::managers::backup::{BackupOrchestrator, JobReport, JobState, RunSummary};
pub use drive_backup::utils::{DeleteOutcome, LocalArtifact, RemoteObject};

// Re-export mock implementations from the main crate
pub use drive_backup::utils::executor::mock::{CommandCall, MockExecutor, MockResponse};
pub use drive_backup::utils::executor::CommandExecutor;
pub use drive_backup::utils::fs_ops::mock::MockFileOps;
pub use drive_backup::utils::fs_ops::{LocalFileOps, RealFileOps};
pub use drive_backup::utils::remote_store::mock::{MockRemoteStore, RemoteCall};
pub use drive_backup::utils::remote_store::RemoteStore;
