//! Foreground execution of external commands with captured output.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{DeployError, Result};

/// Captured result of a completed external command.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Exit code reported by the OS.
    pub code: i32,
    /// Everything the command wrote to stdout.
    pub stdout: String,
    /// Everything the command wrote to stderr.
    pub stderr: String,
}

/// Run an external command to completion and capture its output.
///
/// The environment overlay is merged on top of the inherited environment, so
/// invoked tools keep PATH and friends. A nonzero exit becomes
/// [`DeployError::CommandFailed`] carrying the captured stderr; exceeding
/// `timeout` kills the child and becomes [`DeployError::CommandTimedOut`].
pub async fn run<S: AsRef<str>>(
    args: &[S],
    cwd: &Path,
    env: &[(&str, &str)],
    timeout: Option<Duration>,
) -> Result<ProcessResult> {
    let owned_args: Vec<String> = args.iter().map(|arg| arg.as_ref().to_string()).collect();
    let (program, rest) = split_program(&owned_args)?;

    tracing::debug!(command = %owned_args.join(" "), cwd = %cwd.display(), "Running command");

    let mut command = Command::new(program);
    command
        .args(rest)
        .envs(env.iter().map(|(key, value)| (*key, *value)))
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|source| DeployError::Spawn {
        program: program.clone(),
        source,
    })?;

    let waited = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(output) => output,
            // Dropping the in-flight wait drops the child handle, which
            // kills the process.
            Err(_) => return Err(DeployError::CommandTimedOut { args: owned_args }),
        },
        None => child.wait_with_output().await,
    };
    let output = waited.map_err(|source| DeployError::Spawn {
        program: program.clone(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(DeployError::CommandFailed {
            args: owned_args,
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    Ok(ProcessResult {
        code: output.status.code().unwrap_or(0),
        stdout,
        stderr,
    })
}

pub(crate) fn split_program(args: &[String]) -> Result<(&String, &[String])> {
    args.split_first().ok_or_else(|| DeployError::Spawn {
        program: String::new(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argument vector"),
    })
}
