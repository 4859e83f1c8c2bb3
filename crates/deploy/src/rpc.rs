//! JSON-RPC plumbing for the chain simulator and the devnet nodes.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DeployError, Result};

/// Loopback host every devnet endpoint binds to.
pub const LOCALHOST: &str = "127.0.0.1";

/// L1 RPC port, served first by the chain simulator and later by the l1
/// service.
pub const L1_RPC_PORT: u16 = 8545;
/// L2 execution RPC port.
pub const L2_RPC_PORT: u16 = 9545;
/// Historical L2 execution RPC port.
pub const L2_HISTORICAL_RPC_PORT: u16 = 9445;

/// Timeout for individual RPC requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `host:port` endpoint string for a loopback port.
pub fn local_endpoint(port: u16) -> String {
    format!("{LOCALHOST}:{port}")
}

/// HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// Make a JSON-RPC call and deserialize the `result` field.
///
/// The response's `error` field is checked before the result is touched, so
/// a well-formed error from the node surfaces as [`DeployError::Rpc`] rather
/// than a deserialization failure.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
    id: u64,
) -> Result<T> {
    let rpc_error = |message: String| DeployError::Rpc {
        method: method.to_string(),
        url: url.to_string(),
        message,
    };

    let response = client
        .post(url)
        .json(&serde_json::json!({
            "id": id,
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .send()
        .await?;

    let body: Value = response.json().await?;

    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(rpc_error(message.to_string()));
    }

    let result = body
        .get("result")
        .cloned()
        .ok_or_else(|| rpc_error("no result in response".to_string()))?;

    serde_json::from_value(result).map_err(|err| rpc_error(format!("unexpected result shape: {err}")))
}

/// Fetch the unlocked accounts of a dev-mode node.
pub async fn eth_accounts(endpoint: &str) -> Result<Vec<String>> {
    tracing::info!("Fetch eth_accounts {endpoint}");
    let client = create_client()?;
    json_rpc_call(&client, &format!("http://{endpoint}/"), "eth_accounts", vec![], 2).await
}

/// Dump the full allocation state of the latest block.
pub async fn debug_dump_block(endpoint: &str) -> Result<Value> {
    tracing::info!("Fetch debug_dumpBlock {endpoint}");
    let client = create_client()?;
    json_rpc_call(
        &client,
        &format!("http://{endpoint}/"),
        "debug_dumpBlock",
        vec![Value::String("latest".to_string())],
        3,
    )
    .await
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Accept one connection, read the request, answer with a canned JSON
    /// body, and close.
    async fn serve_one_response(listener: TcpListener, body: &'static str) {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") && request.ends_with(b"}") {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
    }

    async fn bind_local() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        (listener, url)
    }

    #[tokio::test]
    async fn test_json_rpc_call_deserializes_result() {
        let (listener, url) = bind_local().await;
        let server = tokio::spawn(serve_one_response(
            listener,
            r#"{"jsonrpc":"2.0","id":2,"result":["0xabc","0xdef"]}"#,
        ));

        let client = create_client().unwrap();
        let accounts: Vec<String> = json_rpc_call(&client, &url, "eth_accounts", vec![], 2)
            .await
            .unwrap();

        assert_eq!(accounts, vec!["0xabc".to_string(), "0xdef".to_string()]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_json_rpc_call_surfaces_node_errors() {
        let (listener, url) = bind_local().await;
        let server = tokio::spawn(serve_one_response(
            listener,
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"method not found"}}"#,
        ));

        let client = create_client().unwrap();
        let err = json_rpc_call::<Value>(&client, &url, "debug_dumpBlock", vec![], 3)
            .await
            .unwrap_err();

        match err {
            DeployError::Rpc { method, message, .. } => {
                assert_eq!(method, "debug_dumpBlock");
                assert_eq!(message, "method not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_json_rpc_call_rejects_resultless_response() {
        let (listener, url) = bind_local().await;
        let server = tokio::spawn(serve_one_response(listener, r#"{"jsonrpc":"2.0","id":1}"#));

        let client = create_client().unwrap();
        let err = json_rpc_call::<Value>(&client, &url, "eth_chainId", vec![], 1)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::Rpc { .. }));
        server.await.unwrap();
    }

    #[test]
    fn test_local_endpoint_format() {
        assert_eq!(local_endpoint(L1_RPC_PORT), "127.0.0.1:8545");
    }
}
