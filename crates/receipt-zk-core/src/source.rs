//! Receipt source contract and the fixture-backed implementation.
//!
//! Fetching receipts over RPC is the job of an external collaborator; this
//! module only fixes the contract ([`ReceiptSource`]) and ships
//! [`FixtureSource`], which serves receipts recorded in a JSON file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, Log, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ReceiptZkError, Result};

/// A transaction receipt as returned by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub logs: Vec<Log>,
}

/// Anything that can produce transaction receipts.
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    /// Fetch the receipt of `tx_hash` on `chain_id`.
    async fn fetch_receipt(&self, chain_id: u64, tx_hash: B256) -> Result<FetchedReceipt>;
}

#[async_trait]
impl<S: ReceiptSource + ?Sized> ReceiptSource for Arc<S> {
    async fn fetch_receipt(&self, chain_id: u64, tx_hash: B256) -> Result<FetchedReceipt> {
        (**self).fetch_receipt(chain_id, tx_hash).await
    }
}

/// One log as written in a fixture file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureLog {
    pub address: Address,
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

impl FixtureLog {
    fn into_log(self) -> Result<Log> {
        let address = self.address;
        let topics = self.topics.len();
        Log::new(address, self.topics, self.data).ok_or_else(|| {
            ReceiptZkError::ExternalContract(format!(
                "fixture log of {address} has {topics} topics (max 4)"
            ))
        })
    }
}

/// One receipt as written in a fixture file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub logs: Vec<FixtureLog>,
}

/// Contents of a fixture file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    pub receipts: Vec<FixtureReceipt>,
}

fn default_chain_id() -> u64 {
    1
}

/// Serves receipts recorded in memory or in a JSON fixture file.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    chain_id: u64,
    receipts: HashMap<B256, FetchedReceipt>,
}

impl FixtureSource {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            receipts: HashMap::new(),
        }
    }

    /// Build a source from parsed fixture contents.
    pub fn from_fixture(fixture: Fixture) -> Result<Self> {
        let mut source = Self::new(fixture.chain_id);
        for receipt in fixture.receipts {
            let logs = receipt
                .logs
                .into_iter()
                .map(FixtureLog::into_log)
                .collect::<Result<Vec<_>>>()?;
            source.insert(FetchedReceipt {
                tx_hash: receipt.tx_hash,
                block_number: receipt.block_number,
                logs,
            });
        }
        Ok(source)
    }

    /// Load a fixture JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ReceiptZkError::ConfigNotFound {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        let fixture: Fixture =
            serde_json::from_str(&contents).map_err(|e| ReceiptZkError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        tracing::debug!(
            path = %path.display(),
            receipts = fixture.receipts.len(),
            "loaded receipt fixture"
        );
        Self::from_fixture(fixture)
    }

    pub fn insert(&mut self, receipt: FetchedReceipt) {
        self.receipts.insert(receipt.tx_hash, receipt);
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}

#[async_trait]
impl ReceiptSource for FixtureSource {
    async fn fetch_receipt(&self, chain_id: u64, tx_hash: B256) -> Result<FetchedReceipt> {
        if chain_id != self.chain_id {
            return Err(ReceiptZkError::ExternalContract(format!(
                "fixture serves chain {}, requested chain {chain_id}",
                self.chain_id
            )));
        }
        self.receipts
            .get(&tx_hash)
            .cloned()
            .ok_or(ReceiptZkError::ReceiptNotFound(tx_hash))
    }
}
