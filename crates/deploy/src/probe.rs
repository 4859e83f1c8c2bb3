//! Readiness probes for the devnet's network endpoints.

use std::time::Duration;

use crate::error::{DeployError, Result};
use crate::rpc;

/// Connection attempts made by [`wait_for_port`] before giving up.
pub const DEFAULT_PORT_RETRIES: u32 = 10;
/// Pause between connection attempts.
pub const DEFAULT_PORT_INTERVAL: Duration = Duration::from_secs(1);

/// Interval between RPC readiness attempts.
const RPC_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait until a TCP connection to `host:port` succeeds, with the default
/// retry bounds.
pub async fn wait_for_port(host: &str, port: u16) -> Result<()> {
    wait_for_port_with(host, port, DEFAULT_PORT_RETRIES, DEFAULT_PORT_INTERVAL).await
}

/// Wait until a TCP connection to `host:port` succeeds.
///
/// Each failed attempt sleeps for `interval`; after `max_retries` failed
/// attempts the probe gives up with [`DeployError::PortUnreachable`].
pub async fn wait_for_port_with(
    host: &str,
    port: u16,
    max_retries: u32,
    interval: Duration,
) -> Result<()> {
    for _ in 0..max_retries {
        tracing::info!("Trying {host}:{port}");
        match tokio::net::TcpStream::connect((host, port)).await {
            Ok(_) => {
                tracing::info!("Connected {host}:{port}");
                return Ok(());
            }
            Err(_) => tokio::time::sleep(interval).await,
        }
    }

    Err(DeployError::PortUnreachable { port })
}

/// Wait until a JSON-RPC endpoint answers `eth_chainId` with a non-error
/// HTTP status.
///
/// Retries indefinitely: by the time this runs the port probe has already
/// seen a listener, so the endpoint is expected to come up.
pub async fn wait_for_rpc_server(endpoint: &str) -> Result<()> {
    tracing::info!("Waiting for RPC server at {endpoint}");

    let client = rpc::create_client()?;
    let url = format!("http://{endpoint}/");
    let body = serde_json::json!({
        "id": 1,
        "jsonrpc": "2.0",
        "method": "eth_chainId",
        "params": [],
    });

    loop {
        match client.post(&url).json(&body).send().await {
            Ok(response) if response.status().as_u16() < 300 => {
                tracing::info!("RPC server at {endpoint} ready");
                return Ok(());
            }
            _ => {
                tracing::info!("Waiting for RPC server at {endpoint}");
                tokio::time::sleep(RPC_POLL_INTERVAL).await;
            }
        }
    }
}
