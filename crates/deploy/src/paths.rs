//! Filesystem locations derived once from the monorepo root.

use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};

/// Every path the orchestrator touches, derived from the monorepo root.
///
/// Nothing else in the crate composes paths from strings: components receive
/// this struct and read the field they need, so two runs over different roots
/// can never collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    /// Absolute root of the monorepo checkout.
    pub monorepo_dir: PathBuf,
    /// Working directory for generated artifacts.
    pub devnet_dir: PathBuf,
    /// L1 contracts package.
    pub contracts_dir: PathBuf,
    /// Deployment records written by the contract tooling.
    pub deployment_dir: PathBuf,
    /// The contract tooling's native address export.
    pub l1_deployments_path: PathBuf,
    /// Deploy-config directory inside the contracts package.
    pub deploy_config_dir: PathBuf,
    /// Working deploy config, regenerated from the template on every run.
    pub deploy_config_path: PathBuf,
    /// Read-only deploy-config template.
    pub deploy_config_template_path: PathBuf,
    /// Rollup node Go module, home of the genesis generation tooling.
    pub rollup_node_dir: PathBuf,
    /// Compose files and service definitions.
    pub ops_dir: PathBuf,
    /// SDK package; smoke tests run from here.
    pub sdk_dir: PathBuf,
    /// Generated L1 genesis.
    pub genesis_l1_path: PathBuf,
    /// Generated L2 genesis.
    pub genesis_l2_path: PathBuf,
    /// Allocation state captured from the chain simulator.
    pub allocs_path: PathBuf,
    /// Canonical contract address book.
    pub addresses_json_path: PathBuf,
    /// SDK-facing copy of the address book.
    pub sdk_addresses_json_path: PathBuf,
    /// Rollup derivation config.
    pub rollup_config_path: PathBuf,
}

impl PathSet {
    /// Resolve all paths from a monorepo root.
    ///
    /// A relative root is absolutized against the current working directory.
    /// The root does not have to exist yet.
    pub fn new(root: &Path) -> Result<Self> {
        let monorepo_dir = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|source| DeployError::fs("absolutize", root, source))?
                .join(root)
        };

        let devnet_dir = monorepo_dir.join(".devnet");
        let contracts_dir = monorepo_dir.join("packages").join("contracts");
        let deployment_dir = contracts_dir.join("deployments").join("devnetL1");
        let deploy_config_dir = contracts_dir.join("deploy-config");

        Ok(Self {
            l1_deployments_path: deployment_dir.join(".deploy"),
            deploy_config_path: deploy_config_dir.join("devnetL1.json"),
            deploy_config_template_path: deploy_config_dir.join("devnetL1-template.json"),
            rollup_node_dir: monorepo_dir.join("rollup-node"),
            ops_dir: monorepo_dir.join("ops-devnet"),
            sdk_dir: monorepo_dir.join("packages").join("sdk"),
            genesis_l1_path: devnet_dir.join("genesis-l1.json"),
            genesis_l2_path: devnet_dir.join("genesis-l2.json"),
            allocs_path: devnet_dir.join("allocs-l1.json"),
            addresses_json_path: devnet_dir.join("addresses.json"),
            sdk_addresses_json_path: devnet_dir.join("sdk-addresses.json"),
            rollup_config_path: devnet_dir.join("rollup.json"),
            monorepo_dir,
            devnet_dir,
            contracts_dir,
            deployment_dir,
            deploy_config_dir,
        })
    }

    /// Create the devnet working directory if it does not exist yet.
    pub fn ensure_devnet_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.devnet_dir)
            .map_err(|source| DeployError::fs("create directory", self.devnet_dir.clone(), source))
    }

    fn all(&self) -> Vec<&PathBuf> {
        vec![
            &self.devnet_dir,
            &self.contracts_dir,
            &self.deployment_dir,
            &self.l1_deployments_path,
            &self.deploy_config_dir,
            &self.deploy_config_path,
            &self.deploy_config_template_path,
            &self.rollup_node_dir,
            &self.ops_dir,
            &self.sdk_dir,
            &self.genesis_l1_path,
            &self.genesis_l2_path,
            &self.allocs_path,
            &self.addresses_json_path,
            &self.sdk_addresses_json_path,
            &self.rollup_config_path,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_paths_stay_under_root() {
        let paths = PathSet::new(Path::new("/srv/monorepo")).unwrap();

        for path in paths.all() {
            assert!(
                path.starts_with(&paths.monorepo_dir),
                "{} escapes the monorepo root",
                path.display()
            );
        }
    }

    #[test]
    fn test_relative_root_is_absolutized() {
        let paths = PathSet::new(Path::new("some-checkout")).unwrap();

        assert!(paths.monorepo_dir.is_absolute());
        assert!(paths.monorepo_dir.ends_with("some-checkout"));
    }

    #[test]
    fn test_distinct_roots_never_alias() {
        let first = PathSet::new(Path::new("/srv/devnet-a")).unwrap();
        let second = PathSet::new(Path::new("/srv/devnet-b")).unwrap();

        for path in second.all() {
            assert!(
                !path.starts_with(&first.monorepo_dir),
                "{} leaks into the first root",
                path.display()
            );
        }
    }

    #[test]
    fn test_expected_layout() {
        let paths = PathSet::new(Path::new("/srv/monorepo")).unwrap();

        assert_eq!(paths.devnet_dir, Path::new("/srv/monorepo/.devnet"));
        assert_eq!(
            paths.allocs_path,
            Path::new("/srv/monorepo/.devnet/allocs-l1.json")
        );
        assert_eq!(
            paths.l1_deployments_path,
            Path::new("/srv/monorepo/packages/contracts/deployments/devnetL1/.deploy")
        );
        assert_eq!(
            paths.deploy_config_template_path,
            Path::new("/srv/monorepo/packages/contracts/deploy-config/devnetL1-template.json")
        );
    }
}
