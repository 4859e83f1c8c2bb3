//! Process isolation for the contract-deployment step.
//!
//! The deployment work runs in a re-executed copy of the current binary so
//! its whole subprocess tree lives and dies apart from the orchestrator.
//! The child talks back through a single JSON line on stdout; that line, not
//! the exit status, is the channel between the two processes.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{DeployError, Result};

/// Hidden CLI flag that routes a re-executed binary into the
/// contract-deployment entry point.
pub const DEPLOY_CONTRACTS_FLAG: &str = "--deploy-contracts";

/// Outcome reported by an isolated child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChildOutcome {
    Success,
    Failure { message: String },
}

impl ChildOutcome {
    /// Collapse a unit result into an outcome, stringifying the error.
    pub fn from_result(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(err) => Self::Failure {
                message: err.to_string(),
            },
        }
    }
}

/// Emit the outcome line on stdout, from inside the child process.
///
/// The child exits 0 regardless of the outcome; the parent acts on the line
/// alone. A missing line is treated as a failure on the parent side, so
/// nothing is lost if serialization ever comes up short.
pub fn report(result: &Result<()>) {
    match serde_json::to_string(&ChildOutcome::from_result(result)) {
        Ok(line) => println!("{line}"),
        Err(err) => tracing::error!(%err, "Failed to serialize child outcome"),
    }
}

/// Run the contract-deployment work in a separate OS process.
///
/// Re-executes the current binary with the hidden flag. The child shares no
/// state with this process, so the chain simulator stays owned (and torn
/// down) by the caller no matter how the deployment ends.
pub async fn run_deploy_contracts(monorepo_dir: &Path) -> Result<ChildOutcome> {
    let exe = std::env::current_exe().map_err(|source| DeployError::Spawn {
        program: "current executable".to_string(),
        source,
    })?;

    let args = vec![
        DEPLOY_CONTRACTS_FLAG.to_string(),
        "--monorepo-dir".to_string(),
        monorepo_dir.display().to_string(),
    ];
    run_isolated(&exe, &args).await
}

/// Spawn `program args..` with a piped stdout, wait for it to exit, then
/// parse the last stdout line as the outcome.
///
/// Waiting always precedes the parse, so the outcome can never be read
/// before the child has finished writing it. The child's stderr is
/// inherited, which keeps its logs visible in the parent's stream.
pub async fn run_isolated(program: impl AsRef<OsStr>, args: &[String]) -> Result<ChildOutcome> {
    let program_name = program.as_ref().to_string_lossy().into_owned();

    let child = Command::new(&program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| DeployError::Spawn {
            program: program_name.clone(),
            source,
        })?;

    let output = child
        .wait_with_output()
        .await
        .map_err(|source| DeployError::Spawn {
            program: program_name,
            source,
        })?;

    parse_outcome(&output.stdout, output.status.code())
}

/// Extract the outcome from a finished child's captured stdout.
fn parse_outcome(stdout: &[u8], exit_code: Option<i32>) -> Result<ChildOutcome> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| no_outcome(exit_code, "exited without reporting an outcome"))?;

    serde_json::from_str(line.trim())
        .map_err(|_| no_outcome(exit_code, "produced an unreadable outcome line"))
}

fn no_outcome(exit_code: Option<i32>, what: &str) -> DeployError {
    let code = exit_code.map_or_else(|| "unknown".to_string(), |code| code.to_string());
    DeployError::DeploymentFailed(format!("child {what} (exit code {code})"))
}
