//! End-to-end scenarios for drive-backup
//!
//! Each scenario drives the orchestrator through complete runs with the
//! external command, filesystem and remote store replaced by test doubles.

mod failures;
mod local_then_upload;
mod remote_cleanup;
