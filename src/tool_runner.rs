//! Tool execution
//!
//! Every external program goes through a `ToolRunner`. The system runner
//! spawns the tool in its own process group and registers it with the global
//! child registry so a signal outside the critical section can reap it.
//!
//! # Architecture Rule
//!
//! Nothing outside this module spawns a process. Host implementations build a
//! typed `ToolArgs` value and hand it to the runner.

use crate::error::{ProvisionError, Result};
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use crate::tool_traits::ToolArgs;
use std::process::{Command, Stdio};

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl ToolOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(code),
            success: false,
        }
    }

    /// Convert an unsuccessful exit into `ProvisionError::Tool`.
    pub fn ensure_success(self, program: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(ProvisionError::Tool {
                program: program.to_string(),
                code: self.exit_code.unwrap_or(-1),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Executes typed tool invocations.
pub trait ToolRunner {
    /// Run the tool and capture its output. A non-zero exit is not an error
    /// here; callers decide through `ToolOutput::ensure_success`.
    fn run(&self, args: &dyn ToolArgs) -> Result<ToolOutput>;

    /// Run the tool and fail on a non-zero exit.
    fn run_checked(&self, args: &dyn ToolArgs) -> Result<ToolOutput> {
        self.run(args)?.ensure_success(args.program())
    }
}

/// Runner that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, args: &dyn ToolArgs) -> Result<ToolOutput> {
        let program = args.program();
        let cli_args = args.to_cli_args();
        let env_vars = args.get_env_vars();

        // Values may carry secrets, only names are logged
        let env_names: Vec<&str> = env_vars.iter().map(|(k, _)| k.as_str()).collect();
        if args.is_destructive() {
            tracing::warn!("exec (destructive): {} env={:?}", args.render(), env_names);
        } else {
            tracing::info!("exec: {} env={:?}", args.render(), env_names);
        }

        let mut cmd = Command::new(program);
        cmd.args(&cli_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group();
        for (key, value) in &env_vars {
            cmd.env(key, value);
        }

        let child = cmd.spawn()?;
        let pid = child.id();
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }

        let waited = child.wait_with_output();

        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(pid);
        }
        let output = waited?;

        let result = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        };

        if result.success {
            tracing::debug!("{} exited successfully", program);
        } else {
            tracing::info!(
                "{} failed with exit code {}: {}",
                program,
                result.exit_code.unwrap_or(-1),
                result.stderr.trim()
            );
        }
        Ok(result)
    }
}
