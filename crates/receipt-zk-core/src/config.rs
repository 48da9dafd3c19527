//! Session configuration (`receipt-zk.config.json`).
//!
//! Everything a compile-or-prove session needs to know about its
//! environment is carried here and passed explicitly: the chain and RPC
//! endpoint handed to the receipt source, and the directories where compiled
//! artifacts, circuit inputs and the SRS cache are persisted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReceiptZkError, Result};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "receipt-zk.config.json";

/// Configuration scoped to one compile-or-prove session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Chain the receipts are read from (1 = Ethereum mainnet).
    pub chain_id: u64,
    /// RPC endpoint, passed through unchanged to the receipt source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    /// Compiled circuit, keys and circuit inputs are written here.
    pub out_dir: PathBuf,
    /// Structured reference string cache.
    pub srs_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            rpc_url: None,
            out_dir: PathBuf::from("target/circuit-out"),
            srs_dir: PathBuf::from("target/srs"),
        }
    }
}

impl SessionConfig {
    pub fn new(chain_id: u64, out_dir: impl Into<PathBuf>, srs_dir: impl Into<PathBuf>) -> Self {
        Self {
            chain_id,
            rpc_url: None,
            out_dir: out_dir.into(),
            srs_dir: srs_dir.into(),
        }
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = Some(rpc_url.into());
        self
    }

    /// Directory holding serialized circuit inputs.
    pub fn input_dir(&self) -> PathBuf {
        self.out_dir.join("input")
    }

    /// Resolve relative directories against `base` (usually the config file's directory).
    pub fn rebase(mut self, base: &Path) -> Self {
        if self.out_dir.is_relative() {
            self.out_dir = base.join(&self.out_dir);
        }
        if self.srs_dir.is_relative() {
            self.srs_dir = base.join(&self.srs_dir);
        }
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ReceiptZkError::ConfigNotFound {
                path: path.to_path_buf(),
                source: e,
            })?;
        serde_json::from_str(&contents).map_err(|e| ReceiptZkError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ReceiptZkError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = SessionConfig::new(1, "out", "srs").with_rpc_url("http://localhost:8545");
        config.save(&path).unwrap();
        assert_eq!(SessionConfig::load(&path).unwrap(), config);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["chainId"], 1);
        assert_eq!(json["rpcUrl"], "http://localhost:8545");
        assert_eq!(json["outDir"], "out");
    }

    #[test]
    fn test_config_without_rpc_url() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"chainId":5,"outDir":"o","srsDir":"s"}"#).unwrap();
        assert_eq!(config.chain_id, 5);
        assert!(config.rpc_url.is_none());
    }

    #[test]
    fn test_rebase_keeps_absolute_paths() {
        let config = SessionConfig::new(1, "out", "/var/srs").rebase(Path::new("/project"));
        assert_eq!(config.out_dir, PathBuf::from("/project/out"));
        assert_eq!(config.srs_dir, PathBuf::from("/var/srs"));
        assert_eq!(config.input_dir(), PathBuf::from("/project/out/input"));
    }

    #[test]
    fn test_load_missing_config() {
        let err = SessionConfig::load(Path::new("/nonexistent/receipt-zk.config.json")).unwrap_err();
        assert!(matches!(err, ReceiptZkError::ConfigNotFound { .. }));
    }
}
