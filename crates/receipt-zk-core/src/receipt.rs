//! Receipt query data model: [`FieldReference`] and [`ReceiptRecord`].
//!
//! A field reference names one 32-byte word inside one log of a transaction
//! receipt: either an indexed topic or a word of the unindexed data area.
//! References are validated when they are built and again when they are
//! resolved against the fetched log. A reference that cannot address an
//! existing field is an error, never a zero value.

use alloy_primitives::{Address, Log, B256};
use serde::{Deserialize, Serialize};

use crate::error::{ReceiptZkError, Result};

/// Maximum number of topics an Ethereum log can carry (`LOG0`..`LOG4`).
pub const MAX_TOPICS: u32 = 4;

/// Upper bound on the data-area word index a reference may address.
pub const MAX_DATA_WORDS: u32 = 64;

/// Maximum number of field references per receipt record.
pub const MAX_FIELDS_PER_RECEIPT: usize = 4;

/// One value inside one log record of a transaction receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    /// Ordinal position of the log within the transaction's receipt.
    pub log_pos: u32,
    /// Whether the value sits in the indexed-topic area or the data area.
    pub is_topic: bool,
    /// Position within the topic or data area.
    pub field_index: u32,
    /// Contract expected to have emitted the log. Zero means "not declared".
    #[serde(default)]
    pub contract: Address,
    /// Event signature (topic 0). Zero means "not declared".
    #[serde(default)]
    pub event_id: B256,
    /// Expected or extracted content of the field. Zero means "not declared".
    #[serde(default)]
    pub value: B256,
}

impl FieldReference {
    /// Reference topic `index` of log `log_pos`.
    pub fn topic(log_pos: u32, index: u32) -> Result<Self> {
        let field = Self {
            log_pos,
            is_topic: true,
            field_index: index,
            ..Default::default()
        };
        field.validate()?;
        Ok(field)
    }

    /// Reference data word `index` of log `log_pos`.
    pub fn data(log_pos: u32, index: u32) -> Result<Self> {
        let field = Self {
            log_pos,
            is_topic: false,
            field_index: index,
            ..Default::default()
        };
        field.validate()?;
        Ok(field)
    }

    /// Declare the emitting contract and event signature.
    pub fn emitted_by(mut self, contract: Address, event_id: B256) -> Self {
        self.contract = contract;
        self.event_id = event_id;
        self
    }

    /// Declare the expected field value.
    pub fn with_value(mut self, value: B256) -> Self {
        self.value = value;
        self
    }

    /// Name of the log area this reference points into.
    pub fn area(&self) -> &'static str {
        if self.is_topic {
            "topic"
        } else {
            "data"
        }
    }

    /// Static bounds check, independent of any fetched log.
    pub fn validate(&self) -> Result<()> {
        let bound = if self.is_topic {
            MAX_TOPICS
        } else {
            MAX_DATA_WORDS
        };
        if self.field_index >= bound {
            return Err(self.malformed(format!(
                "{} index must be below {bound}",
                self.area()
            )));
        }
        Ok(())
    }

    /// Read the addressed word from `log`.
    ///
    /// Fails with [`ReceiptZkError::MalformedFieldReference`] when the log has
    /// no such topic or data word.
    pub fn read(&self, log: &Log) -> Result<B256> {
        let index = self.field_index as usize;
        if self.is_topic {
            let topics = log.data.topics();
            topics.get(index).copied().ok_or_else(|| {
                self.malformed(format!("log has only {} topics", topics.len()))
            })
        } else {
            let data = &log.data.data;
            let start = index * 32;
            if data.len() < start + 32 {
                return Err(self.malformed(format!(
                    "log data holds only {} words",
                    data.len() / 32
                )));
            }
            Ok(B256::from_slice(&data[start..start + 32]))
        }
    }

    /// Resolve this reference against the fetched receipt logs.
    ///
    /// Returns a copy with contract, event id and value taken from the log.
    /// Declared (non-zero) values must agree with what the log contains.
    pub fn resolve(&self, tx_hash: B256, logs: &[Log]) -> Result<Self> {
        let log = logs.get(self.log_pos as usize).ok_or_else(|| {
            self.malformed(format!("receipt has only {} logs", logs.len()))
        })?;
        let event_id = log.data.topics().first().copied().ok_or_else(|| {
            self.malformed("anonymous log has no event signature".to_string())
        })?;
        let value = self.read(log)?;

        let mismatch = |what: &'static str, declared: String, found: String| {
            ReceiptZkError::FieldMismatch {
                tx_hash,
                log_pos: self.log_pos,
                what,
                declared,
                found,
            }
        };
        if !self.contract.is_zero() && self.contract != log.address {
            return Err(mismatch(
                "contract",
                self.contract.to_string(),
                log.address.to_string(),
            ));
        }
        if !self.event_id.is_zero() && self.event_id != event_id {
            return Err(mismatch(
                "event id",
                self.event_id.to_string(),
                event_id.to_string(),
            ));
        }
        if !self.value.is_zero() && self.value != value {
            return Err(mismatch("value", self.value.to_string(), value.to_string()));
        }

        Ok(Self {
            contract: log.address,
            event_id,
            value,
            ..self.clone()
        })
    }

    fn malformed(&self, reason: String) -> ReceiptZkError {
        ReceiptZkError::MalformedFieldReference {
            log_pos: self.log_pos,
            area: self.area(),
            field_index: self.field_index,
            reason,
        }
    }
}

/// One log-bearing transaction to be proven over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRecord {
    pub tx_hash: B256,
    /// Block containing the transaction; `None` until resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Field references in on-chain log order.
    pub fields: Vec<FieldReference>,
}

impl ReceiptRecord {
    /// Build a record, validating every field reference.
    pub fn new(tx_hash: B256, fields: Vec<FieldReference>) -> Result<Self> {
        let record = Self {
            tx_hash,
            block_number: None,
            fields,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn with_block_number(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }

    /// Check the field budget and every field's static bounds.
    pub fn validate(&self) -> Result<()> {
        if self.fields.len() > MAX_FIELDS_PER_RECEIPT {
            let last = &self.fields[MAX_FIELDS_PER_RECEIPT];
            return Err(ReceiptZkError::MalformedFieldReference {
                log_pos: last.log_pos,
                area: last.area(),
                field_index: last.field_index,
                reason: format!(
                    "a receipt record holds at most {MAX_FIELDS_PER_RECEIPT} fields, got {}",
                    self.fields.len()
                ),
            });
        }
        self.fields.iter().try_for_each(FieldReference::validate)
    }

    /// Resolve every field against the fetched logs.
    pub fn resolve(&self, block_number: u64, logs: &[Log]) -> Result<Self> {
        if let Some(declared) = self.block_number {
            if declared != block_number {
                return Err(ReceiptZkError::FieldMismatch {
                    tx_hash: self.tx_hash,
                    log_pos: 0,
                    what: "block number",
                    declared: declared.to_string(),
                    found: block_number.to_string(),
                });
            }
        }
        let fields = self
            .fields
            .iter()
            .map(|field| field.resolve(self.tx_hash, logs))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            tx_hash: self.tx_hash,
            block_number: Some(block_number),
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, Bytes};

    const TRANSFER: B256 =
        b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");
    const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

    fn transfer_log(amount: u8) -> Log {
        let mut data = [0u8; 32];
        data[31] = amount;
        Log::new_unchecked(
            WETH,
            vec![TRANSFER, B256::with_last_byte(0xaa), B256::with_last_byte(0xbb)],
            Bytes::from(data.to_vec()),
        )
    }

    #[test]
    fn test_topic_index_past_log_bound_rejected() {
        let err = FieldReference::topic(0, 4).unwrap_err();
        assert!(matches!(
            err,
            ReceiptZkError::MalformedFieldReference { field_index: 4, .. }
        ));
    }

    #[test]
    fn test_data_index_past_bound_rejected() {
        assert!(FieldReference::data(0, MAX_DATA_WORDS).is_err());
        assert!(FieldReference::data(0, MAX_DATA_WORDS - 1).is_ok());
    }

    #[test]
    fn test_read_missing_topic_slot() {
        let log = Log::new_unchecked(WETH, vec![TRANSFER], Bytes::new());
        let field = FieldReference::topic(0, 2).unwrap();
        let err = field.read(&log).unwrap_err();
        assert!(matches!(err, ReceiptZkError::MalformedFieldReference { .. }));
    }

    #[test]
    fn test_read_data_word() {
        let field = FieldReference::data(0, 0).unwrap();
        let word = field.read(&transfer_log(7)).unwrap();
        assert_eq!(word, B256::with_last_byte(7));
    }

    #[test]
    fn test_resolve_fills_contract_event_and_value() {
        let field = FieldReference::topic(0, 1).unwrap();
        let resolved = field.resolve(B256::ZERO, &[transfer_log(1)]).unwrap();
        assert_eq!(resolved.contract, WETH);
        assert_eq!(resolved.event_id, TRANSFER);
        assert_eq!(resolved.value, B256::with_last_byte(0xaa));
    }

    #[test]
    fn test_resolve_rejects_declared_mismatch() {
        let field = FieldReference::topic(0, 2)
            .unwrap()
            .emitted_by(WETH, TRANSFER)
            .with_value(B256::with_last_byte(0xcc));
        let err = field.resolve(B256::ZERO, &[transfer_log(1)]).unwrap_err();
        assert!(matches!(err, ReceiptZkError::FieldMismatch { what: "value", .. }));
    }

    #[test]
    fn test_resolve_rejects_missing_log() {
        let field = FieldReference::topic(3, 1).unwrap();
        let err = field.resolve(B256::ZERO, &[transfer_log(1)]).unwrap_err();
        assert!(matches!(
            err,
            ReceiptZkError::MalformedFieldReference { log_pos: 3, .. }
        ));
    }

    #[test]
    fn test_record_field_budget() {
        let fields = vec![FieldReference::topic(0, 1).unwrap(); MAX_FIELDS_PER_RECEIPT + 1];
        assert!(ReceiptRecord::new(B256::ZERO, fields).is_err());
    }

    #[test]
    fn test_record_serde_camel_case() {
        let record = ReceiptRecord::new(B256::ZERO, vec![FieldReference::topic(2, 1).unwrap()])
            .unwrap()
            .with_block_number(18_446_788);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["blockNumber"], 18_446_788);
        assert_eq!(json["fields"][0]["logPos"], 2);
        assert_eq!(json["fields"][0]["isTopic"], true);
        let back: ReceiptRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
