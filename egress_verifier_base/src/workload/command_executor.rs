//! Whitelisted command execution for workload backends
//!
//! Backends drive their substrate through CLIs (`aws`, `docker`, `podman`).
//! Only whitelisted programs may run, with a cleared environment plus an
//! explicit list of variables passed through from the caller.

use std::collections::HashSet;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const RESTRICTED_PATH: &str = "/usr/local/bin:/usr/bin:/bin:/usr/sbin:/sbin";

/// Executes substrate commands with a whitelist and timeout enforcement
#[derive(Clone)]
pub struct SystemCommandExecutor {
    default_timeout: Duration,
    allowed_commands: HashSet<String>,
    passthrough_env: Vec<String>,
    extra_env: Vec<(String, String)>,
}

impl SystemCommandExecutor {
    /// Create executor with empty whitelist - must be configured before use
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            default_timeout: timeout,
            allowed_commands: HashSet::new(),
            passthrough_env: Vec::new(),
            extra_env: Vec::new(),
        }
    }

    pub fn allow_command(&mut self, command: impl Into<String>) {
        self.allowed_commands.insert(command.into());
    }

    pub fn allow_commands(&mut self, commands: &[&str]) {
        for cmd in commands {
            self.allowed_commands.insert(cmd.to_string());
        }
    }

    pub fn is_allowed(&self, command: &str) -> bool {
        self.allowed_commands.contains(command)
    }

    /// Copy these variables from the calling process environment, when set
    pub fn pass_env(&mut self, names: &[&str]) {
        for name in names {
            if !self.passthrough_env.iter().any(|n| n == name) {
                self.passthrough_env.push(name.to_string());
            }
        }
    }

    /// Set a variable explicitly, overriding any passthrough value
    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.extra_env.push((name.into(), value.into()));
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute command with timeout and capture output
    pub fn execute(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, CommandError> {
        if !self.allowed_commands.contains(program) {
            return Err(CommandError::SecurityViolation {
                reason: format!("Command '{}' not in whitelist", program),
            });
        }

        let timeout_duration = timeout.unwrap_or(self.default_timeout);
        let start = Instant::now();

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env_clear()
            .env("PATH", RESTRICTED_PATH)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for name in &self.passthrough_env {
            if let Ok(value) = std::env::var(name) {
                cmd.env(name, value);
            }
        }
        for (name, value) in &self.extra_env {
            cmd.env(name, value);
        }

        log::debug!("Executing '{}' with {} args", program, args.len());

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CommandError::ProgramNotFound {
                program: program.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => CommandError::PermissionDenied {
                program: program.to_string(),
            },
            _ => CommandError::ExecutionFailed {
                program: program.to_string(),
                reason: e.to_string(),
            },
        })?;

        // Drain both pipes while waiting so a chatty child cannot block on write
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let result = match wait_timeout::ChildExt::wait_timeout(&mut child, timeout_duration) {
            Ok(result) => result,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CommandError::ExecutionFailed {
                    program: program.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        match result {
            Some(status) => {
                let stdout = join_reader(stdout_reader, program)?;
                let stderr = join_reader(stderr_reader, program)?;

                Ok(CommandOutput {
                    stdout: String::from_utf8_lossy(&stdout).to_string(),
                    stderr: String::from_utf8_lossy(&stderr).to_string(),
                    exit_code: status.code().unwrap_or(-1),
                    duration: start.elapsed(),
                })
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout_ms: timeout_duration.as_millis() as u64,
                })
            }
        }
    }

    /// Execute and require exit code 0, returning stdout
    pub fn execute_checked(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<String, CommandError> {
        let output = self.execute(program, args, timeout)?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(CommandError::NonZeroExit {
                program: program.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

type PipeReader = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> PipeReader {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_reader(reader: PipeReader, program: &str) -> Result<Vec<u8>, CommandError> {
    let Some(handle) = reader else {
        return Ok(Vec::new());
    };
    match handle.join() {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(CommandError::ExecutionFailed {
            program: program.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(CommandError::ExecutionFailed {
            program: program.to_string(),
            reason: "output reader thread panicked".to_string(),
        }),
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Command execution output
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Command execution errors
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Program not found: {program}")]
    ProgramNotFound { program: String },

    #[error("Execution failed for '{program}': {reason}")]
    ExecutionFailed { program: String, reason: String },

    #[error("'{program}' timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u64 },

    #[error("Permission denied: {program}")]
    PermissionDenied { program: String },

    #[error("Security violation: {reason}")]
    SecurityViolation { reason: String },

    #[error("'{program}' exited with code {exit_code}: {stderr}")]
    NonZeroExit {
        program: String,
        exit_code: i32,
        stderr: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_empty_whitelist() {
        let executor = SystemCommandExecutor::new();
        assert!(!executor.is_allowed("aws"));
        assert!(!executor.is_allowed("docker"));
    }

    #[test]
    fn test_whitelist_management() {
        let mut executor = SystemCommandExecutor::new();

        executor.allow_command("aws");
        assert!(executor.is_allowed("aws"));
        assert!(!executor.is_allowed("docker"));

        executor.allow_commands(&["docker", "podman"]);
        assert!(executor.is_allowed("docker"));
        assert!(executor.is_allowed("podman"));
    }

    #[test]
    fn test_security_violation() {
        let executor = SystemCommandExecutor::new();
        let result = executor.execute("rm", &["-rf", "/"], None);
        assert_matches!(result, Err(CommandError::SecurityViolation { .. }));
    }

    #[test]
    fn test_missing_program() {
        let mut executor = SystemCommandExecutor::new();
        executor.allow_command("definitely-not-a-real-binary-nv");
        let result = executor.execute("definitely-not-a-real-binary-nv", &[], None);
        assert_matches!(result, Err(CommandError::ProgramNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_is_cleared_except_passthrough() {
        let mut executor = SystemCommandExecutor::new();
        executor.allow_command("sh");
        executor.set_env("NV_TEST_VALUE", "present");

        let output = executor
            .execute("sh", &["-c", "echo \"$NV_TEST_VALUE:${HOME:-unset}\""], None)
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "present:unset");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let mut executor = SystemCommandExecutor::with_timeout(Duration::from_millis(50));
        executor.allow_command("sleep");
        let result = executor.execute("sleep", &["5"], None);
        assert_matches!(result, Err(CommandError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_checked_reports_exit_code() {
        let mut executor = SystemCommandExecutor::new();
        executor.allow_command("sh");
        let result = executor.execute_checked("sh", &["-c", "echo oops >&2; exit 3"], None);
        assert_matches!(result, Err(CommandError::NonZeroExit { exit_code: 3, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_large_output_does_not_block() {
        let mut executor = SystemCommandExecutor::with_timeout(Duration::from_secs(10));
        executor.allow_command("sh");
        let output = executor
            .execute("sh", &["-c", "head -c 200000 /dev/zero | tr '\\0' 'a'"], None)
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.len(), 200_000);
    }

    #[cfg(unix)]
    #[test]
    fn test_large_stderr_does_not_block() {
        let mut executor = SystemCommandExecutor::with_timeout(Duration::from_secs(10));
        executor.allow_command("sh");
        let output = executor
            .execute("sh", &["-c", "head -c 200000 /dev/zero | tr '\\0' 'b' >&2; echo done"], None)
            .unwrap();
        assert_eq!(output.stdout.trim(), "done");
        assert_eq!(output.stderr.len(), 200_000);
    }
}
