//! Utilities for running commands with proper error handling and timeouts

use crate::error::{BackupError, Result};
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use tracing::{debug, error};

/// Run a command with optional timeout
///
/// A non-zero exit status is reported as [`BackupError::ExternalCommandFailed`]
/// carrying the exit code and captured stderr.
pub fn run_command(program: &str, args: &[&str], timeout: Option<Duration>) -> Result<Output> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("Running command: {} {}", program, args.join(" "));

    let output = match timeout {
        Some(timeout_duration) => run_with_timeout(cmd, program, timeout_duration)?,
        None => cmd.output().map_err(|source| BackupError::Spawn {
            program: program.to_string(),
            source,
        })?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!("Command failed: {} {}", program, args.join(" "));
        if !stderr.is_empty() {
            error!("Stderr: {}", stderr);
        }
        return Err(BackupError::ExternalCommandFailed {
            program: program.to_string(),
            exit_code: output.status.code(),
            stderr,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.is_empty() {
        debug!("Command output: {}", stdout);
    }

    Ok(output)
}

fn run_with_timeout(cmd: Command, program: &str, timeout: Duration) -> Result<Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut cmd = tokio::process::Command::from(cmd);
    // The child is killed when the timed-out future is dropped
    cmd.kill_on_drop(true);

    runtime.block_on(async {
        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(output) => output.map_err(|source| BackupError::Spawn {
                program: program.to_string(),
                source,
            }),
            Err(_) => Err(BackupError::CommandTimedOut {
                program: program.to_string(),
                timeout,
            }),
        }
    })
}

/// Build the argument vector for a command, optionally elevated through sudo
///
/// Returns `(program, args)`.
pub fn elevated<'a>(use_sudo: bool, program: &'a str, args: &[&'a str]) -> (&'a str, Vec<&'a str>) {
    if use_sudo {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(program);
        full.extend_from_slice(args);
        ("sudo", full)
    } else {
        (program, args.to_vec())
    }
}
