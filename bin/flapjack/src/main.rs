//! flapjack is a CLI tool that brings up a local rollup devnet from a monorepo checkout.

mod cli;

use anyhow::Result;
use clap::Parser;

use cli::Cli;
use flapjack_deploy::{DevnetEnv, PathSet, child, deploy, genesis, smoke};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr: stdout is reserved for the child outcome line and
    // the smoke tests' tagged output.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let paths = PathSet::new(&cli.monorepo_dir)?;
    let env = DevnetEnv {
        no_build: cli.no_build,
        plasma: cli.plasma,
    };

    // Re-executed child entry point. The outcome line is the only success
    // signal, so the exit code stays 0 either way.
    if cli.deploy_contracts {
        let result = genesis::deploy_contracts(&paths).await;
        child::report(&result);
        return Ok(());
    }

    if cli.test {
        tracing::info!("Testing deployed devnet");
        smoke::run_smoke_tests(&paths).await?;
        return Ok(());
    }

    paths.ensure_devnet_dir()?;

    if cli.allocs {
        genesis::generate_l1_genesis(&paths, &env).await?;
        return Ok(());
    }

    if env.no_build {
        tracing::info!("Skipping docker images build");
    } else {
        deploy::build_images(&paths).await?;
    }

    tracing::info!(
        monorepo_dir = %paths.monorepo_dir.display(),
        "Devnet starting"
    );
    deploy::deploy_devnet(&paths, &env).await?;

    Ok(())
}
