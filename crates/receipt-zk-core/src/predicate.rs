//! Predicate expression tree evaluated over one stream item.
//!
//! Predicates are plain data so a pipeline can be inspected, serialized into
//! the compiled shape, and tested without a backend. Every operand of an
//! `All`/`Any` node is always evaluated: operands are 0/1 values, not lazy
//! branches.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::api::CircuitApi;
use crate::error::{ReceiptZkError, Result};
use crate::receipt::MAX_FIELDS_PER_RECEIPT;

/// Which word of a field reference an operand reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldPart {
    /// Emitting contract, left-padded to 32 bytes.
    Contract,
    EventId,
    Value,
}

/// A word-valued leaf of a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operand {
    /// A word of field `field` of the current record.
    Field { field: usize, part: FieldPart },
    /// A named circuit constant, bound from the assignment.
    Constant(String),
    /// A word fixed in the circuit shape.
    Literal(B256),
}

impl Operand {
    pub fn contract(field: usize) -> Self {
        Self::Field {
            field,
            part: FieldPart::Contract,
        }
    }

    pub fn event_id(field: usize) -> Self {
        Self::Field {
            field,
            part: FieldPart::EventId,
        }
    }

    pub fn value(field: usize) -> Self {
        Self::Field {
            field,
            part: FieldPart::Value,
        }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self::Constant(name.into())
    }

    pub fn literal(word: B256) -> Self {
        Self::Literal(word)
    }

    pub(crate) fn validate(&self, constants: &BTreeSet<String>) -> Result<()> {
        match self {
            Operand::Field { field, .. } if *field >= MAX_FIELDS_PER_RECEIPT => {
                Err(ReceiptZkError::InvalidPipeline(format!(
                    "field slot {field} out of range (records hold {MAX_FIELDS_PER_RECEIPT} fields)"
                )))
            }
            Operand::Constant(name) if !constants.contains(name) => Err(
                ReceiptZkError::InvalidPipeline(format!("undeclared constant '{name}'")),
            ),
            _ => Ok(()),
        }
    }

    pub(crate) fn load<A: CircuitApi>(
        &self,
        api: &mut A,
        item: &StreamItem<A::Word, A::Bit>,
        bindings: &BTreeMap<String, A::Word>,
    ) -> Result<A::Word> {
        match self {
            Operand::Field { field, part } => {
                let loaded = item.fields.get(*field).ok_or_else(|| {
                    ReceiptZkError::InvalidPipeline(format!("field slot {field} out of range"))
                })?;
                Ok(match part {
                    FieldPart::Contract => loaded.contract.clone(),
                    FieldPart::EventId => loaded.event_id.clone(),
                    FieldPart::Value => loaded.value.clone(),
                })
            }
            Operand::Constant(name) => bindings
                .get(name)
                .cloned()
                .ok_or_else(|| ReceiptZkError::MissingConstant(name.clone())),
            Operand::Literal(word) => Ok(api.constant(*word)),
        }
    }
}

/// Boolean expression over the operands of one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    Const(bool),
    Eq(Operand, Operand),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub const TRUE: Predicate = Predicate::Const(true);

    pub fn eq(a: Operand, b: Operand) -> Self {
        Self::Eq(a, b)
    }

    /// `operand` equals one of `candidates`.
    pub fn one_of(operand: Operand, candidates: impl IntoIterator<Item = Operand>) -> Self {
        Self::Any(
            candidates
                .into_iter()
                .map(|c| Self::Eq(operand.clone(), c))
                .collect(),
        )
    }

    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::All(predicates.into_iter().collect())
    }

    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Any(predicates.into_iter().collect())
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::All(vec![self, other])
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::Any(vec![self, other])
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Check every operand against the declared constants and field budget.
    pub fn validate(&self, constants: &BTreeSet<String>) -> Result<()> {
        match self {
            Predicate::Const(_) => Ok(()),
            Predicate::Eq(a, b) => {
                a.validate(constants)?;
                b.validate(constants)
            }
            Predicate::All(children) | Predicate::Any(children) => children
                .iter()
                .try_for_each(|child| child.validate(constants)),
            Predicate::Not(inner) => inner.validate(constants),
        }
    }

    /// Evaluate against one stream item through `api`.
    pub fn evaluate<A: CircuitApi>(
        &self,
        api: &mut A,
        item: &StreamItem<A::Word, A::Bit>,
        bindings: &BTreeMap<String, A::Word>,
    ) -> Result<A::Bit> {
        match self {
            Predicate::Const(value) => Ok(api.bit(*value)),
            Predicate::Eq(a, b) => {
                let a = a.load(api, item, bindings)?;
                let b = b.load(api, item, bindings)?;
                Ok(api.is_equal(&a, &b))
            }
            Predicate::All(children) => {
                let bits = Self::evaluate_all(children, api, item, bindings)?;
                Ok(api.and(&bits))
            }
            Predicate::Any(children) => {
                let bits = Self::evaluate_all(children, api, item, bindings)?;
                Ok(api.or(&bits))
            }
            Predicate::Not(inner) => {
                let bit = inner.evaluate(api, item, bindings)?;
                Ok(api.not(&bit))
            }
        }
    }

    fn evaluate_all<A: CircuitApi>(
        children: &[Predicate],
        api: &mut A,
        item: &StreamItem<A::Word, A::Bit>,
        bindings: &BTreeMap<String, A::Word>,
    ) -> Result<Vec<A::Bit>> {
        children
            .iter()
            .map(|child| child.evaluate(api, item, bindings))
            .collect()
    }
}

/// The three words of one field reference, as loaded into the circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedField<W> {
    pub contract: W,
    pub event_id: W,
    pub value: W,
}

/// One slot of a stream inside the circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamItem<W, B> {
    /// Whether the slot still participates after the filters applied so far.
    pub active: B,
    /// Always `MAX_FIELDS_PER_RECEIPT` entries; unused fields load as zero.
    pub fields: Vec<LoadedField<W>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::NativeApi;

    fn item(contract: u8, event: u8) -> StreamItem<B256, bool> {
        let mut fields = vec![
            LoadedField {
                contract: B256::ZERO,
                event_id: B256::ZERO,
                value: B256::ZERO,
            };
            MAX_FIELDS_PER_RECEIPT
        ];
        fields[0].contract = B256::with_last_byte(contract);
        fields[0].event_id = B256::with_last_byte(event);
        StreamItem {
            active: true,
            fields,
        }
    }

    fn bindings() -> BTreeMap<String, B256> {
        BTreeMap::from([
            ("A".to_string(), B256::with_last_byte(0xa)),
            ("B".to_string(), B256::with_last_byte(0xb)),
        ])
    }

    #[test]
    fn test_one_of() {
        let pred = Predicate::one_of(
            Operand::contract(0),
            [Operand::constant("A"), Operand::constant("B")],
        );
        let mut api = NativeApi::new();
        assert!(pred.evaluate(&mut api, &item(0xa, 1), &bindings()).unwrap());
        assert!(pred.evaluate(&mut api, &item(0xb, 1), &bindings()).unwrap());
        assert!(!pred.evaluate(&mut api, &item(0xc, 1), &bindings()).unwrap());
    }

    #[test]
    fn test_and_with_literal() {
        let pred = Predicate::eq(Operand::contract(0), Operand::constant("A"))
            .and(Predicate::eq(Operand::event_id(0), Operand::literal(B256::with_last_byte(7))));
        let mut api = NativeApi::new();
        assert!(pred.evaluate(&mut api, &item(0xa, 7), &bindings()).unwrap());
        assert!(!pred.evaluate(&mut api, &item(0xa, 8), &bindings()).unwrap());
        assert!(pred.clone().not().evaluate(&mut api, &item(0xa, 8), &bindings()).unwrap());
    }

    #[test]
    fn test_validate_rejects_bad_operands() {
        let declared = BTreeSet::from(["A".to_string()]);
        let undeclared = Predicate::eq(Operand::contract(0), Operand::constant("Z"));
        assert!(undeclared.validate(&declared).is_err());
        let out_of_range = Predicate::eq(Operand::value(MAX_FIELDS_PER_RECEIPT), Operand::constant("A"));
        assert!(out_of_range.validate(&declared).is_err());
        assert!(Predicate::TRUE.validate(&declared).is_ok());
    }

    #[test]
    fn test_missing_binding_is_error() {
        let pred = Predicate::eq(Operand::contract(0), Operand::constant("C"));
        let mut api = NativeApi::new();
        let err = pred.evaluate(&mut api, &item(1, 1), &bindings()).unwrap_err();
        assert!(matches!(err, ReceiptZkError::MissingConstant(name) if name == "C"));
    }
}
