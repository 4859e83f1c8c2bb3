//! Concurrent smoke tests against a deployed devnet.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::command::split_program;
use crate::error::{DeployError, Result};
use crate::paths::PathSet;

/// Run-time budget for a single smoke-test command, streaming included.
const PRESET_TIMEOUT: Duration = Duration::from_secs(8 * 60);

/// Number of presets allowed to run at once.
const MAX_WORKERS: usize = 2;

/// A named external command with its own working directory and timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPreset {
    /// Short name used to tag this command's output lines.
    pub name: String,
    /// Full argument vector, program first.
    pub args: Vec<String>,
    /// Working directory for the command.
    pub cwd: PathBuf,
    /// Budget for the whole run.
    pub timeout: Duration,
}

/// Run the deposit smoke tests against an already-deployed devnet.
pub async fn run_smoke_tests(paths: &PathSet) -> Result<()> {
    run_presets(smoke_presets(paths), MAX_WORKERS).await
}

/// The two deposit tests, on distinct signers so their nonce management
/// cannot collide, well away from the accounts the devnet services use.
fn smoke_presets(paths: &PathSet) -> Vec<CommandPreset> {
    let addresses = paths.addresses_json_path.display().to_string();

    let deposit_preset = |name: &str, task: &str, signer_index: &str| CommandPreset {
        name: name.to_string(),
        args: vec![
            "npx".to_string(),
            "hardhat".to_string(),
            task.to_string(),
            "--network".to_string(),
            "devnetL1".to_string(),
            "--l1-contracts-json-path".to_string(),
            addresses.clone(),
            "--signer-index".to_string(),
            signer_index.to_string(),
        ],
        cwd: paths.sdk_dir.clone(),
        timeout: PRESET_TIMEOUT,
    };

    vec![
        deposit_preset("erc20-test", "deposit-erc20", "14"),
        deposit_preset("eth-test", "deposit-eth", "15"),
    ]
}

/// Run presets concurrently on a bounded worker pool.
///
/// Every preset runs to its own completion or failure; the first failure in
/// completion order becomes the overall error once all of them have
/// finished.
pub async fn run_presets(presets: Vec<CommandPreset>, max_workers: usize) -> Result<()> {
    let results: Vec<Result<Vec<String>>> = stream::iter(presets.into_iter().map(run_preset))
        .buffer_unordered(max_workers)
        .collect()
        .await;

    let mut first_failure = None;
    for result in results {
        if let Err(err) = result {
            tracing::error!(%err, "Smoke test failed");
            first_failure.get_or_insert(err);
        }
    }
    match first_failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Run one preset, echoing its stdout line by line tagged with a timestamp
/// and the preset's name. Returns the tagged lines.
///
/// The child carries kill-on-drop, so no orphan survives a timeout or a
/// failure elsewhere in the pool. Stderr is drained concurrently to keep the
/// child from blocking on a full pipe, and is reported only on failure.
pub async fn run_preset(preset: CommandPreset) -> Result<Vec<String>> {
    let (program, rest) = split_program(&preset.args)?;
    let program_name = program.clone();

    tracing::info!(name = %preset.name, command = %preset.args.join(" "), "Running smoke test");

    let mut child = Command::new(program)
        .args(rest)
        .current_dir(&preset.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| DeployError::Spawn {
            program: program_name.clone(),
            source,
        })?;

    let stdout = child.stdout.take().ok_or_else(|| missing_pipe(&program_name))?;
    let stderr = child.stderr.take().ok_or_else(|| missing_pipe(&program_name))?;

    let name = preset.name.clone();
    let streamed = tokio::time::timeout(preset.timeout, async move {
        let stderr_task = tokio::spawn(async move {
            let mut stderr = stderr;
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut tagged = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = tag_line(&name, &line);
            println!("{line}");
            tagged.push(line);
        }

        let status = child.wait().await;
        let stderr_text = stderr_task.await.unwrap_or_default();
        (status, stderr_text, tagged)
    })
    .await;

    let (status, stderr_text, tagged) = match streamed {
        Ok(parts) => parts,
        // Elapsing drops the future and with it the child handle, which
        // kills the process.
        Err(_) => return Err(DeployError::CommandTimedOut { args: preset.args }),
    };

    let status = status.map_err(|source| DeployError::Spawn {
        program: program_name,
        source,
    })?;

    if !status.success() {
        return Err(DeployError::CommandFailed {
            args: preset.args,
            code: status.code().unwrap_or(-1),
            stderr: stderr_text,
        });
    }

    Ok(tagged)
}

fn missing_pipe(program: &str) -> DeployError {
    DeployError::Spawn {
        program: program.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "output pipe not captured"),
    }
}

/// Prefix an output line with the current UTC time and the command's name.
fn tag_line(name: &str, line: &str) -> String {
    let timestamp = chrono::Utc::now().format("%H:%M:%S%.6f");
    format!("[{timestamp}][{name}] {line}")
}
