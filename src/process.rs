use anyhow::{Context, Result};
use std::process::Command;

/// Outcome of an external command: exit status plus captured output.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, or `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Capability interface for invoking external commands, so that failure
/// handling and logging stay outside the orchestration logic and tests can
/// script process outcomes.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs commands via `std::process`, blocking until completion.
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to start {program}"))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
