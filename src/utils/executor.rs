//! Command execution abstraction for testability
//!
//! This module provides a trait-based abstraction for command execution,
//! enabling dependency injection and mocking for tests.

use crate::error::Result;
use std::process::Output;
use std::time::Duration;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a command with optional timeout; non-zero exit is an error
    fn run_command(&self, program: &str, args: &[&str], timeout: Option<Duration>) -> Result<Output>;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn run_command(&self, program: &str, args: &[&str], timeout: Option<Duration>) -> Result<Output> {
        super::command::run_command(program, args, timeout)
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use crate::error::BackupError;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
    }

    impl CommandCall {
        /// Program and arguments as one vector, with a leading `sudo` removed
        pub fn command_line(&self) -> Vec<String> {
            let mut line = vec![self.program.clone()];
            line.extend(self.args.iter().cloned());
            if line.first().map(String::as_str) == Some("sudo") {
                line.remove(0);
            }
            line
        }
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String },
        Failure { stderr: String, exit_code: i32 },
        Timeout,
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
            }
        }
    }

    /// Mock executor for testing
    ///
    /// Responses are keyed by the effective program, i.e. the first word after
    /// an optional `sudo`.
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Pre-configured responses: program name -> response
        responses: Arc<Mutex<HashMap<String, MockResponse>>>,
        /// Default response when no specific response is configured
        default_response: Arc<Mutex<MockResponse>>,
        /// Flags whose following argument names a file a successful call creates
        output_flags: Arc<Mutex<Vec<String>>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for a specific program
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(program.to_string(), response);
            self
        }

        /// Set the default response for unconfigured programs
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Create the file named after `flag` whenever a call succeeds,
        /// e.g. `"-czf"` for tar archives
        pub fn creating_output_after(self, flag: &str) -> Self {
            self.output_flags.lock().unwrap().push(flag.to_string());
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Check if a program was called (directly or through sudo)
        pub fn was_called(&self, program: &str) -> bool {
            self.call_count(program) > 0
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.command_line().first().map(String::as_str) == Some(program))
                .count()
        }

        fn get_response(&self, program: &str) -> MockResponse {
            self.responses
                .lock()
                .unwrap()
                .get(program)
                .cloned()
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }

        fn apply_side_effects(&self, call: &CommandCall) {
            let line = call.command_line();
            let flags = self.output_flags.lock().unwrap().clone();
            let paths: Vec<PathBuf> = line
                .windows(2)
                .filter(|pair| flags.contains(&pair[0]))
                .map(|pair| PathBuf::from(&pair[1]))
                .collect();
            for path in paths {
                if let Some(parent) = path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                let _ = std::fs::write(&path, b"mock artifact");
            }
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run_command(
            &self,
            program: &str,
            args: &[&str],
            timeout: Option<Duration>,
        ) -> Result<Output> {
            let call = CommandCall {
                program: program.to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
            };
            self.calls.lock().unwrap().push(call.clone());

            let effective = call.command_line()[0].clone();
            match self.get_response(&effective) {
                MockResponse::Success { stdout } => {
                    self.apply_side_effects(&call);
                    Ok(Output {
                        status: std::process::ExitStatus::default(),
                        stdout: stdout.into_bytes(),
                        stderr: Vec::new(),
                    })
                }
                MockResponse::Failure { stderr, exit_code } => {
                    Err(BackupError::ExternalCommandFailed {
                        program: program.to_string(),
                        exit_code: Some(exit_code),
                        stderr,
                    })
                }
                MockResponse::Timeout => Err(BackupError::CommandTimedOut {
                    program: program.to_string(),
                    timeout: timeout.unwrap_or_default(),
                }),
            }
        }
    }
}
