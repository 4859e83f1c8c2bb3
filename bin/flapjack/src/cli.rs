use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "flapjack")]
#[command(
    author,
    version,
    about = "Bring up a local rollup devnet from a monorepo checkout"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "FLAPJACK_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Root of the monorepo checkout to deploy from.
    #[arg(long, env = "FLAPJACK_MONOREPO_DIR", default_value = ".")]
    pub monorepo_dir: PathBuf,

    /// Generate the L1 allocation state and exit without deploying anything.
    #[arg(long, conflicts_with = "test")]
    pub allocs: bool,

    /// Run the smoke tests against an already-deployed devnet.
    #[arg(long)]
    pub test: bool,

    /// Skip building the docker images.
    #[arg(long, env = "DEVNET_NO_BUILD")]
    pub no_build: bool,

    /// Switch the deploy config to the alternate data-availability mode.
    #[arg(long, env = "DEVNET_PLASMA")]
    pub plasma: bool,

    /// Run the contract-deployment work unit and report its outcome on
    /// stdout. Set by the orchestrator when it re-executes itself; not for
    /// direct use.
    #[arg(long, hide = true, conflicts_with_all = ["allocs", "test"])]
    pub deploy_contracts: bool,
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["flapjack"]).unwrap();

        assert_eq!(cli.monorepo_dir, PathBuf::from("."));
        assert!(!cli.allocs);
        assert!(!cli.test);
        assert!(!cli.deploy_contracts);
    }

    #[test]
    fn test_allocs_conflicts_with_test() {
        let err = Cli::try_parse_from(["flapjack", "--allocs", "--test"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_child_flag_matches_library_constant() {
        let cli = Cli::try_parse_from([
            "flapjack",
            flapjack_deploy::DEPLOY_CONTRACTS_FLAG,
            "--monorepo-dir",
            "/srv/monorepo",
        ])
        .unwrap();

        assert!(cli.deploy_contracts);
        assert_eq!(cli.monorepo_dir, PathBuf::from("/srv/monorepo"));
    }
}
