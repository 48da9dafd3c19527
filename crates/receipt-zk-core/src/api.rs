//! Capability interface between the predicate pipeline and a proof backend.
//!
//! The pipeline never touches concrete values directly. Every load,
//! comparison and boolean combinator goes through [`CircuitApi`], so the same
//! pipeline definition can be solved natively ([`NativeApi`]) or recorded as
//! a constraint shape by a backend.
//!
//! Values passed to `load_*` and `public_input` are witness data: a backend
//! recording the shape must not let them influence what it records.
//! `constant` and `bit` values are part of the shape.

use alloy_primitives::{B256, U256};

use crate::error::{ReceiptZkError, Result};

/// Where an assertion was declared, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertContext {
    /// Index of the pipeline stage.
    pub stage: usize,
    /// Stream slot the assertion applies to.
    pub slot: usize,
}

/// Fixed-width arithmetic and comparison primitives used by predicates.
pub trait CircuitApi {
    /// A 32-byte word.
    type Word: Clone;
    /// A boolean (0/1) value.
    type Bit: Clone;

    /// Load a private witness word.
    fn load_word(&mut self, value: B256) -> Self::Word;

    /// Load a private witness bit.
    fn load_bit(&mut self, value: bool) -> Self::Bit;

    /// Bind a named public input (a circuit constant supplied by the assignment).
    fn public_input(&mut self, name: &str, value: B256) -> Self::Word;

    /// A word fixed in the circuit shape.
    fn constant(&mut self, value: B256) -> Self::Word;

    /// A bit fixed in the circuit shape.
    fn bit(&mut self, value: bool) -> Self::Bit;

    /// Exact equality over the full 32-byte width.
    fn is_equal(&mut self, a: &Self::Word, b: &Self::Word) -> Self::Bit;

    /// Conjunction of all operands; `true` for an empty slice.
    fn and(&mut self, operands: &[Self::Bit]) -> Self::Bit;

    /// Disjunction of all operands; `false` for an empty slice.
    fn or(&mut self, operands: &[Self::Bit]) -> Self::Bit;

    fn not(&mut self, bit: &Self::Bit) -> Self::Bit;

    /// `a` when `cond` holds, otherwise `b`.
    fn select(&mut self, cond: &Self::Bit, a: &Self::Word, b: &Self::Word) -> Self::Word;

    /// Word from a bit (0 or 1).
    fn bit_to_word(&mut self, bit: &Self::Bit) -> Self::Word;

    /// 256-bit unsigned addition.
    fn add(&mut self, a: &Self::Word, b: &Self::Word, stage: usize) -> Result<Self::Word>;

    /// Constrain `bit` to be true.
    fn assert_true(&mut self, bit: &Self::Bit, ctx: AssertContext) -> Result<()>;

    /// Expose `word` as a public output.
    fn output(&mut self, word: &Self::Word);
}

/// Solves the pipeline over concrete values.
#[derive(Debug, Default, Clone)]
pub struct NativeApi {
    public_inputs: Vec<(String, B256)>,
    outputs: Vec<B256>,
}

impl NativeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Public inputs in binding order.
    pub fn public_inputs(&self) -> &[(String, B256)] {
        &self.public_inputs
    }

    /// Public outputs in declaration order.
    pub fn outputs(&self) -> &[B256] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<B256> {
        self.outputs
    }
}

impl CircuitApi for NativeApi {
    type Word = B256;
    type Bit = bool;

    fn load_word(&mut self, value: B256) -> B256 {
        value
    }

    fn load_bit(&mut self, value: bool) -> bool {
        value
    }

    fn public_input(&mut self, name: &str, value: B256) -> B256 {
        self.public_inputs.push((name.to_string(), value));
        value
    }

    fn constant(&mut self, value: B256) -> B256 {
        value
    }

    fn bit(&mut self, value: bool) -> bool {
        value
    }

    fn is_equal(&mut self, a: &B256, b: &B256) -> bool {
        a == b
    }

    fn and(&mut self, operands: &[bool]) -> bool {
        operands.iter().all(|b| *b)
    }

    fn or(&mut self, operands: &[bool]) -> bool {
        operands.iter().any(|b| *b)
    }

    fn not(&mut self, bit: &bool) -> bool {
        !bit
    }

    fn select(&mut self, cond: &bool, a: &B256, b: &B256) -> B256 {
        if *cond {
            *a
        } else {
            *b
        }
    }

    fn bit_to_word(&mut self, bit: &bool) -> B256 {
        B256::with_last_byte(u8::from(*bit))
    }

    fn add(&mut self, a: &B256, b: &B256, stage: usize) -> Result<B256> {
        let sum = U256::from_be_bytes(a.0)
            .checked_add(U256::from_be_bytes(b.0))
            .ok_or(ReceiptZkError::ArithmeticOverflow { stage })?;
        Ok(B256::from(sum.to_be_bytes::<32>()))
    }

    fn assert_true(&mut self, bit: &bool, ctx: AssertContext) -> Result<()> {
        if *bit {
            Ok(())
        } else {
            Err(ReceiptZkError::AssertionFailed {
                stage: ctx.stage,
                slot: ctx.slot,
            })
        }
    }

    fn output(&mut self, word: &B256) {
        self.outputs.push(*word);
    }
}
