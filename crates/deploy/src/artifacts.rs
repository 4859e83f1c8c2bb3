//! JSON artifact IO and the contract address book.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};

/// Read and parse a JSON artifact.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| DeployError::fs("read", path, source))?;

    serde_json::from_str(&content).map_err(|source| DeployError::MalformedJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a JSON artifact, pretty-printed with two-space indent.
///
/// The payload lands in a sibling temporary file first and is renamed over
/// the final path, so the artifact is never observable half-written: its
/// presence under the final name implies the producing step completed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).map_err(|source| {
        DeployError::MalformedJson {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let tmp = tmp_sibling(path);
    std::fs::write(&tmp, payload).map_err(|source| DeployError::fs("write", tmp.clone(), source))?;
    std::fs::rename(&tmp, path).map_err(|source| DeployError::fs("rename", tmp.clone(), source))
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Contract name to deployed address mapping exported by the contract
/// tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook {
    addresses: BTreeMap<String, String>,
}

impl AddressBook {
    /// Load the address book from a JSON artifact.
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Write a copy of the address book.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    /// Look up a deployed contract address.
    pub fn get(&self, name: &str) -> Result<&str> {
        self.addresses
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DeployError::MissingAddress(name.to_string()))
    }
}
