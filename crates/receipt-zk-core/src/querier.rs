//! Receipt queries and circuit-input building.
//!
//! [`ReceiptQuerier`] collects the receipt records an application wants to
//! prove over, resolves them against a [`ReceiptSource`] and packages the
//! result into a [`CircuitInput`]: the serialized blob handed to a proving
//! backend together with the assignment.

use std::path::{Path, PathBuf};

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::circuit::{Allocation, Assignment, CircuitDescriptor};
use crate::config::SessionConfig;
use crate::error::{ReceiptZkError, Result};
use crate::receipt::ReceiptRecord;
use crate::source::ReceiptSource;
use crate::stream::DataStream;

/// Resolved receipt data for one proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitInput {
    pub chain_id: u64,
    pub allocation: Allocation,
    pub receipts: Vec<ReceiptRecord>,
    /// SHA-256 over the chain id and the canonical JSON of `receipts`.
    pub input_commitment: B256,
}

impl CircuitInput {
    pub fn new(chain_id: u64, allocation: Allocation, receipts: Vec<ReceiptRecord>) -> Result<Self> {
        let input_commitment = Self::commitment_of(chain_id, &receipts)?;
        Ok(Self {
            chain_id,
            allocation,
            receipts,
            input_commitment,
        })
    }

    pub fn commitment_of(chain_id: u64, receipts: &[ReceiptRecord]) -> Result<B256> {
        let encoded = serde_json::to_vec(receipts).map_err(anyhow::Error::from)?;
        let mut hasher = Sha256::new();
        hasher.update(chain_id.to_be_bytes());
        hasher.update(&encoded);
        let digest: [u8; 32] = hasher.finalize().into();
        Ok(B256::from(digest))
    }

    /// Recompute the commitment; a blob edited after building is rejected.
    pub fn verify_commitment(&self) -> Result<()> {
        let expected = Self::commitment_of(self.chain_id, &self.receipts)?;
        if expected != self.input_commitment {
            return Err(ReceiptZkError::ExternalContract(format!(
                "circuit input commitment mismatch: recorded {}, computed {expected}",
                self.input_commitment
            )));
        }
        Ok(())
    }

    /// Rebuild the fixed-capacity receipt stream.
    pub fn stream(&self) -> Result<DataStream> {
        let mut stream = DataStream::with_capacity(self.allocation.max_receipts);
        for record in &self.receipts {
            stream.append(record.clone())?;
        }
        Ok(stream)
    }

    /// Write to `<dir>/<commitment>.json`, returning the path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", hex::encode(self.input_commitment)));
        let json = serde_json::to_string_pretty(self).map_err(|e| ReceiptZkError::ConfigParse {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ReceiptZkError::ConfigNotFound {
                path: path.to_path_buf(),
                source: e,
            })?;
        let input: Self =
            serde_json::from_str(&contents).map_err(|e| ReceiptZkError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        input
            .receipts
            .iter()
            .try_for_each(ReceiptRecord::validate)?;
        input.verify_commitment()?;
        Ok(input)
    }
}

/// Collects receipt queries and builds circuit inputs from a source.
pub struct ReceiptQuerier<S> {
    config: SessionConfig,
    source: S,
    queries: Vec<ReceiptRecord>,
}

impl<S: ReceiptSource> ReceiptQuerier<S> {
    pub fn new(config: SessionConfig, source: S) -> Self {
        Self {
            config,
            source,
            queries: Vec::new(),
        }
    }

    /// Queue a receipt query. Field references are validated immediately.
    pub fn add_receipt(&mut self, record: ReceiptRecord) -> Result<()> {
        record.validate()?;
        self.queries.push(record);
        Ok(())
    }

    /// Resolve every query and package the circuit input.
    ///
    /// The assignment is checked against the descriptor here so a missing or
    /// stray constant fails before any receipt is fetched.
    pub async fn build_circuit_input(
        &self,
        descriptor: &CircuitDescriptor,
        assignment: &Assignment,
    ) -> Result<CircuitInput> {
        descriptor.check_assignment(assignment)?;

        let allocation = descriptor.allocation();
        if self.queries.len() > allocation.max_receipts {
            return Err(ReceiptZkError::CapacityExceeded {
                capacity: allocation.max_receipts,
            });
        }

        let mut stream = descriptor.new_stream();
        for query in &self.queries {
            let fetched = self
                .source
                .fetch_receipt(self.config.chain_id, query.tx_hash)
                .await?;
            let resolved = query.resolve(fetched.block_number, &fetched.logs)?;
            tracing::debug!(
                tx = %query.tx_hash,
                block = fetched.block_number,
                fields = resolved.fields.len(),
                "resolved receipt query"
            );
            stream.append(resolved)?;
        }

        let input = CircuitInput::new(self.config.chain_id, allocation, stream.records().to_vec())?;
        tracing::info!(
            receipts = input.receipts.len(),
            capacity = allocation.max_receipts,
            commitment = %input.input_commitment,
            "circuit input built"
        );
        Ok(input)
    }

    /// Persist `input` under the session's input directory.
    pub fn write_input(&self, input: &CircuitInput) -> Result<PathBuf> {
        input.save(&self.config.input_dir())
    }
}
