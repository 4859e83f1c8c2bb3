//! flapjack-deploy - Devnet bring-up library.
//!
//! This crate sequences everything between a monorepo checkout and a running
//! devnet: genesis-state generation on a throwaway chain simulator, contract
//! deployment in an isolated child process, service bring-up, readiness
//! probing, and the deposit smoke tests.

pub mod artifacts;
pub mod child;
pub mod command;
pub mod config;
pub mod deploy;
pub mod genesis;
pub mod paths;
pub mod probe;
pub mod rpc;
pub mod smoke;

mod error;

pub use artifacts::AddressBook;
pub use child::{ChildOutcome, DEPLOY_CONTRACTS_FLAG};
pub use command::ProcessResult;
pub use config::DevnetEnv;
pub use error::{DeployError, Result};
pub use paths::PathSet;
pub use smoke::CommandPreset;
