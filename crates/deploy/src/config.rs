//! Deploy-config materialization and run-scoped flags.

use serde_json::{Map, Value};

use crate::artifacts;
use crate::error::Result;
use crate::paths::PathSet;

/// Flags read from the environment exactly once at startup and threaded
/// through the orchestrators from there.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevnetEnv {
    /// Skip the docker image build step.
    pub no_build: bool,
    /// Switch the deploy config to the alternate data-availability mode.
    pub plasma: bool,
}

/// Deploy-config key refreshed with the wall-clock time on regeneration.
const L1_GENESIS_TIMESTAMP_KEY: &str = "l1GenesisBlockTimestamp";

/// Deploy-config key for the alternate data-availability mode.
const USE_PLASMA_KEY: &str = "usePlasma";

/// Materialize the working deploy config from the template.
///
/// The template itself is never modified. With `update_timestamp`, the L1
/// genesis timestamp is set to the current Unix time, 0x-prefixed hex.
pub fn init_deploy_config(paths: &PathSet, env: &DevnetEnv, update_timestamp: bool) -> Result<()> {
    let mut config: Map<String, Value> = artifacts::read_json(&paths.deploy_config_template_path)?;

    if update_timestamp {
        let now = chrono::Utc::now().timestamp();
        config.insert(
            L1_GENESIS_TIMESTAMP_KEY.to_string(),
            Value::String(format!("{now:#x}")),
        );
    }
    if env.plasma {
        config.insert(USE_PLASMA_KEY.to_string(), Value::Bool(true));
    }

    artifacts::write_json(&paths.deploy_config_path, &config)
}
