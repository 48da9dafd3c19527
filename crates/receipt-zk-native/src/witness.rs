use alloy_primitives::B256;

use receipt_zk_core::api::{AssertContext, CircuitApi, NativeApi};
use receipt_zk_core::error::Result;

/// Solves the circuit natively while keeping every private value it loads.
#[derive(Debug, Default)]
pub(crate) struct WitnessSolver {
    inner: NativeApi,
    private: Vec<B256>,
}

impl WitnessSolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Private words in load order, public inputs and outputs.
    pub(crate) fn finish(self) -> (Vec<B256>, Vec<(String, B256)>, Vec<B256>) {
        let public_inputs = self.inner.public_inputs().to_vec();
        (self.private, public_inputs, self.inner.into_outputs())
    }
}

impl CircuitApi for WitnessSolver {
    type Word = B256;
    type Bit = bool;

    fn load_word(&mut self, value: B256) -> B256 {
        self.private.push(value);
        self.inner.load_word(value)
    }

    fn load_bit(&mut self, value: bool) -> bool {
        self.private.push(B256::with_last_byte(u8::from(value)));
        self.inner.load_bit(value)
    }

    fn public_input(&mut self, name: &str, value: B256) -> B256 {
        self.inner.public_input(name, value)
    }

    fn constant(&mut self, value: B256) -> B256 {
        self.inner.constant(value)
    }

    fn bit(&mut self, value: bool) -> bool {
        self.inner.bit(value)
    }

    fn is_equal(&mut self, a: &B256, b: &B256) -> bool {
        self.inner.is_equal(a, b)
    }

    fn and(&mut self, operands: &[bool]) -> bool {
        self.inner.and(operands)
    }

    fn or(&mut self, operands: &[bool]) -> bool {
        self.inner.or(operands)
    }

    fn not(&mut self, bit: &bool) -> bool {
        self.inner.not(bit)
    }

    fn select(&mut self, cond: &bool, a: &B256, b: &B256) -> B256 {
        self.inner.select(cond, a, b)
    }

    fn bit_to_word(&mut self, bit: &bool) -> B256 {
        self.inner.bit_to_word(bit)
    }

    fn add(&mut self, a: &B256, b: &B256, stage: usize) -> Result<B256> {
        self.inner.add(a, b, stage)
    }

    fn assert_true(&mut self, bit: &bool, ctx: AssertContext) -> Result<()> {
        self.inner.assert_true(bit, ctx)
    }

    fn output(&mut self, word: &B256) {
        self.inner.output(word)
    }
}
