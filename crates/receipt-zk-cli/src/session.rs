use std::path::Path;

use alloy_primitives::B256;
use anyhow::{Context, Result};

use receipt_zk_core::artifacts::ProofFile;
use receipt_zk_core::backend::{ProvingBackend, SetupArtifacts};
use receipt_zk_core::circuit::CircuitDescriptor;
use receipt_zk_core::config::SessionConfig;
use receipt_zk_core::querier::{CircuitInput, ReceiptQuerier};
use receipt_zk_core::source::ReceiptSource;

use crate::apps::DemoApp;
use crate::AppChoice;

/// Flags that override values from the session config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub rpc_url: Option<String>,
    pub chain_id: Option<u64>,
}

/// Load the session config at `path`, falling back to defaults when absent.
///
/// Relative directories are resolved against the config file's directory.
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<SessionConfig> {
    let mut config = if path.exists() {
        let base = path.parent().unwrap_or(Path::new("."));
        SessionConfig::load(path)?.rebase(base)
    } else {
        tracing::debug!(path = %path.display(), "no session config, using defaults");
        SessionConfig::default()
    };
    if let Some(rpc_url) = &overrides.rpc_url {
        config.rpc_url = Some(rpc_url.clone());
    }
    if let Some(chain_id) = overrides.chain_id {
        config.chain_id = chain_id;
    }
    Ok(config)
}

pub fn parse_tx_hash(s: &str) -> Result<B256> {
    s.trim()
        .parse::<B256>()
        .with_context(|| format!("invalid transaction hash: {s}"))
}

/// One demo app bound to a session config.
pub struct Session {
    pub config: SessionConfig,
    pub app: Box<dyn DemoApp>,
    pub descriptor: CircuitDescriptor,
}

impl Session {
    pub fn new(config: SessionConfig, choice: AppChoice) -> Result<Self> {
        let app = choice.app();
        let descriptor = CircuitDescriptor::new(&*app)
            .with_context(|| format!("defining circuit for {}", choice.as_str()))?;
        Ok(Self {
            config,
            app,
            descriptor,
        })
    }

    /// Query the app's receipts for `tx_hash` and persist the circuit input.
    pub async fn build_input<S: ReceiptSource>(
        &self,
        source: S,
        tx_hash: B256,
    ) -> Result<CircuitInput> {
        let mut querier = ReceiptQuerier::new(self.config.clone(), source);
        for record in self.app.queries(tx_hash)? {
            querier.add_receipt(record)?;
        }
        let input = querier
            .build_circuit_input(&self.descriptor, &self.app.assignment())
            .await?;
        let path = querier.write_input(&input)?;
        tracing::debug!(path = %path.display(), "circuit input written");
        Ok(input)
    }

    /// Build a witness over `input`, prove it and check the proof.
    pub async fn prove(
        &self,
        backend: &dyn ProvingBackend,
        setup: &SetupArtifacts,
        input: &CircuitInput,
    ) -> Result<ProofFile> {
        let (witness, public_witness) = backend
            .new_full_witness(&self.descriptor, &self.app.assignment(), input)
            .await?;
        let proof = backend.prove(setup, &witness).await?;
        backend.verify(setup, &public_witness, &proof).await?;
        Ok(ProofFile {
            proof,
            public_witness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt-zk.config.json");
        SessionConfig::new(5, "out", "srs").save(&path).unwrap();

        let config = load_config(
            &path,
            &Overrides {
                rpc_url: Some("http://localhost:8545".into()),
                chain_id: Some(1),
            },
        )
        .unwrap();
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.rpc_url.as_deref(), Some("http://localhost:8545"));
        assert_eq!(config.out_dir, dir.path().join("out"));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/cfg.json"), &Overrides::default()).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_parse_tx_hash() {
        assert!(parse_tx_hash(
            "0xcd88108ce4961294b4544342946f4f9696fd734fbc1e1452834c4923423e514a"
        )
        .is_ok());
        assert!(parse_tx_hash("0x1234").is_err());
    }
}
