//! Error types shared across the deploy library.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while bringing up a devnet.
#[derive(Debug, Error)]
pub enum DeployError {
    /// An external command exited with a nonzero status.
    #[error("command `{}` failed with return code {code}: {stderr}", args.join(" "))]
    CommandFailed {
        args: Vec<String>,
        code: i32,
        stderr: String,
    },

    /// An external command outlived its budget and was killed.
    #[error("command `{}` timed out", args.join(" "))]
    CommandTimedOut { args: Vec<String> },

    /// An external command could not be started or waited on.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// A TCP readiness probe exhausted its retries.
    #[error("gave up waiting for port {port}")]
    PortUnreachable { port: u16 },

    /// The isolated contract-deployment child reported a failure, or exited
    /// without reporting anything at all.
    #[error("contract deployment failed in child process: {0}")]
    DeploymentFailed(String),

    /// The address book has no entry for a required contract.
    #[error("no address recorded for contract `{0}`")]
    MissingAddress(String),

    /// A JSON-RPC endpoint returned an error object or an unusable result.
    #[error("JSON-RPC `{method}` to {url} failed: {message}")]
    Rpc {
        method: String,
        url: String,
        message: String,
    },

    /// HTTP transport failure while talking to an RPC endpoint.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A JSON artifact could not be parsed or serialized.
    #[error("malformed JSON artifact {}: {source}", path.display())]
    MalformedJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A filesystem operation on an artifact path failed.
    #[error("failed to {action} {}: {source}", path.display())]
    Fs {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DeployError {
    pub(crate) fn fs(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Fs {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DeployError>;
