//! L1 genesis generation: chain simulator lifecycle, isolated contract
//! deployment, and allocation-state capture.

use std::process::Stdio;

use serde_json::Value;
use tokio::process::{Child, Command};

use crate::artifacts;
use crate::child::{self, ChildOutcome};
use crate::command;
use crate::config::{self, DevnetEnv};
use crate::error::{DeployError, Result};
use crate::paths::PathSet;
use crate::{probe, rpc};

/// Create2 deployer account, seeded before its deployment transaction is
/// published.
const CREATE2_DEPLOYER_ADDRESS: &str = "0x3fAB184622Dc19b6109349B94811493BF2a45362";

/// Pre-signed transaction that deploys the create2 deployer contract.
const CREATE2_DEPLOYER_TX: &str = "0xf8a58085174876e800830186a08080b853604580600e600039806000f350fe7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe03601600081602082378035828234f58015156039578182fd5b8082525050506014600cf31ba02222222222222222222222222222222222222222222222222222222222222222a02222222222222222222222222222222222222222222222222222222222222222";

/// L1 contract deployer account.
const CONTRACT_DEPLOYER_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// A dev-mode chain simulator owned for the duration of genesis generation.
///
/// The child handle carries kill-on-drop, so the simulator dies with this
/// struct even when its owner unwinds early.
struct ChainSimulator {
    child: Child,
}

impl ChainSimulator {
    /// Spawn geth in dev mode with the RPC surface genesis capture needs:
    /// the debug namespace for the state dump, archive mode so the dump
    /// sees everything, and unprotected transactions for the pre-signed
    /// create2 deployment.
    fn start() -> Result<Self> {
        let child = Command::new("geth")
            .args([
                "--dev",
                "--http",
                "--http.api",
                "eth,debug,web3",
                "--verbosity",
                "4",
                "--gcmode",
                "archive",
                "--dev.gaslimit",
                "30000000",
                "--rpc.allow-unprotected-txs",
            ])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DeployError::Spawn {
                program: "geth".to_string(),
                source,
            })?;

        tracing::info!("Started chain simulator");
        Ok(Self { child })
    }

    /// Terminate the simulator and reap it.
    async fn shutdown(mut self) {
        // An already-dead child makes start_kill fail; wait() still reaps it.
        let _ = self.child.start_kill();
        if let Err(err) = self.child.wait().await {
            tracing::warn!(%err, "Failed to reap chain simulator");
        }
        tracing::info!("Chain simulator terminated");
    }
}

/// Generate the L1 genesis inputs: deploy the contracts into a throwaway
/// dev chain and capture the resulting allocation state.
pub async fn generate_l1_genesis(paths: &PathSet, env: &DevnetEnv) -> Result<()> {
    tracing::info!("Generating L1 genesis state");

    clean_slate(paths)?;
    config::init_deploy_config(paths, env, false)?;

    let simulator = ChainSimulator::start()?;
    let result = deploy_and_capture(paths).await;
    // Teardown happens on every exit path, before the result is inspected.
    simulator.shutdown().await;
    result
}

/// The simulator-dependent half of genesis generation: isolated contract
/// deployment followed by the allocation dump.
async fn deploy_and_capture(paths: &PathSet) -> Result<()> {
    match child::run_deploy_contracts(&paths.monorepo_dir).await? {
        ChildOutcome::Success => {}
        ChildOutcome::Failure { message } => {
            return Err(DeployError::DeploymentFailed(message));
        }
    }

    let allocs: Value = rpc::debug_dump_block(&rpc::local_endpoint(rpc::L1_RPC_PORT)).await?;
    artifacts::write_json(&paths.allocs_path, &allocs)
}

/// Remove stale deploy-config and deployment records so the simulator run
/// starts from a clean slate.
fn clean_slate(paths: &PathSet) -> Result<()> {
    ignore_missing(std::fs::remove_file(&paths.deploy_config_path))
        .map_err(|source| DeployError::fs("remove", paths.deploy_config_path.clone(), source))?;
    ignore_missing(std::fs::remove_dir_all(&paths.deployment_dir))
        .map_err(|source| DeployError::fs("remove", paths.deployment_dir.clone(), source))?;
    Ok(())
}

fn ignore_missing(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Contract-deployment work unit, run inside the isolated child process.
///
/// Waits out the simulator's startup, seeds the two well-known deployer
/// accounts from the dev node's own funds, publishes the create2 deployer,
/// runs the deployment tooling, and copies the exported address book to its
/// canonical location.
pub async fn deploy_contracts(paths: &PathSet) -> Result<()> {
    probe::wait_for_port(rpc::LOCALHOST, rpc::L1_RPC_PORT).await?;
    let endpoint = rpc::local_endpoint(rpc::L1_RPC_PORT);
    probe::wait_for_rpc_server(&endpoint).await?;

    let accounts = rpc::eth_accounts(&endpoint).await?;
    let account = accounts.first().ok_or_else(|| DeployError::Rpc {
        method: "eth_accounts".to_string(),
        url: endpoint.clone(),
        message: "dev node returned no accounts".to_string(),
    })?;
    tracing::info!("Deploying from account {account}");

    let rpc_url = format!("http://{endpoint}");

    // Fund the create2 deployer account.
    command::run(
        &fund_account_args(account, &rpc_url, CREATE2_DEPLOYER_ADDRESS),
        &paths.contracts_dir,
        &[],
        None,
    )
    .await?;

    // Publish the create2 deployer itself.
    command::run(
        &[
            "cast",
            "publish",
            "--rpc-url",
            rpc_url.as_str(),
            CREATE2_DEPLOYER_TX,
        ],
        &paths.contracts_dir,
        &[],
        None,
    )
    .await?;

    // Fund the contract deployer account.
    command::run(
        &fund_account_args(account, &rpc_url, CONTRACT_DEPLOYER_ADDRESS),
        &paths.contracts_dir,
        &[],
        None,
    )
    .await?;

    command::run(
        &["npx", "hardhat", "deploy", "--network", "devnetL1", "--tags", "setup"],
        &paths.contracts_dir,
        &[],
        None,
    )
    .await?;

    command::run(
        &["npx", "hardhat", "export-addresses", "--network", "devnetL1"],
        &paths.contracts_dir,
        &[],
        None,
    )
    .await?;

    // Copy, not move: the tooling's native export stays behind as a record.
    std::fs::copy(&paths.l1_deployments_path, &paths.addresses_json_path)
        .map_err(|source| DeployError::fs("copy", paths.l1_deployments_path.clone(), source))?;

    Ok(())
}

/// `cast send` argument vector moving one ether from an unlocked dev account
/// to a deployer account.
fn fund_account_args(from: &str, rpc_url: &str, recipient: &str) -> Vec<String> {
    vec![
        "cast".to_string(),
        "send".to_string(),
        "--from".to_string(),
        from.to_string(),
        "--rpc-url".to_string(),
        rpc_url.to_string(),
        "--unlocked".to_string(),
        "--value".to_string(),
        "1ether".to_string(),
        recipient.to_string(),
    ]
}
