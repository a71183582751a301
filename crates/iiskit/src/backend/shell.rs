//! Executor that runs command lines through the system shell.

use crate::backend::Executor;
use crate::error::{Error, Result};
use std::process::{Command, Output};

/// Runs command lines with `cmd /C` on Windows and `sh -c` elsewhere.
///
/// The command line is passed through verbatim so `%windir%` and the
/// quoting built by [`crate::command`] reach the shell unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    /// Create a new shell executor.
    pub fn new() -> Self {
        Self
    }

    #[cfg(windows)]
    fn spawn(command_line: &str) -> std::io::Result<Output> {
        use std::os::windows::process::CommandExt;

        Command::new("cmd")
            .arg("/C")
            .raw_arg(command_line)
            .output()
    }

    #[cfg(not(windows))]
    fn spawn(command_line: &str) -> std::io::Result<Output> {
        Command::new("sh").arg("-c").arg(command_line).output()
    }
}

impl Executor for ShellExecutor {
    fn execute(&self, command_line: &str) -> Result<String> {
        let output = Self::spawn(command_line).map_err(|e| Error::CommandFailed {
            command: command_line.to_string(),
            message: format!("failed to start shell: {e}"),
        })?;

        if !output.status.success() {
            log::debug!("Command exited with {}: {}", output.status, command_line);
        }

        Ok(combine_output(&output))
    }
}

/// Stdout followed by stderr, the way an interactive shell would show them.
fn combine_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}
