//! Shape recording: runs a descriptor through a [`CircuitApi`] that only
//! collects gates.
//!
//! Witness values handed to `load_*` and `public_input` are dropped on the
//! floor, so the recorded shape depends on the allocation, the pipeline and
//! the constant names, never on records or assignment values.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use receipt_zk_core::api::{AssertContext, CircuitApi};
use receipt_zk_core::circuit::{Allocation, CircuitDescriptor};
use receipt_zk_core::error::Result;

/// Index of a value in the recorded circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Gate {
    WitnessWord,
    WitnessBit,
    PublicInput { name: String },
    Constant { value: B256 },
    ConstantBit { value: bool },
    IsEqual { a: Wire, b: Wire },
    And { operands: Vec<Wire> },
    Or { operands: Vec<Wire> },
    Not { a: Wire },
    Select { cond: Wire, a: Wire, b: Wire },
    BitToWord { a: Wire },
    Add { a: Wire, b: Wire },
    AssertTrue { a: Wire, stage: usize },
    Output { a: Wire },
}

impl Gate {
    /// Whether the gate defines a new wire.
    fn defines_wire(&self) -> bool {
        !matches!(self, Gate::AssertTrue { .. } | Gate::Output { .. })
    }
}

/// The recorded circuit, persisted as `circuit.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitShape {
    pub allocation: Allocation,
    pub public_inputs: Vec<String>,
    pub witness_words: usize,
    pub gates: Vec<Gate>,
}

impl CircuitShape {
    pub fn constraint_count(&self) -> usize {
        self.gates.len()
    }

    /// SHA-256 of the canonical JSON encoding.
    pub fn digest(&self) -> Result<B256> {
        let encoded = serde_json::to_vec(self).map_err(anyhow::Error::from)?;
        let digest: [u8; 32] = Sha256::digest(&encoded).into();
        Ok(B256::from(digest))
    }
}

/// Record the shape of `descriptor` over an empty stream and zero placeholders.
pub fn record(descriptor: &CircuitDescriptor) -> Result<CircuitShape> {
    let mut recorder = ShapeRecorder::default();
    descriptor.synthesize(
        &mut recorder,
        &descriptor.new_stream(),
        &descriptor.placeholder_assignment(),
    )?;
    Ok(CircuitShape {
        allocation: descriptor.allocation(),
        public_inputs: recorder.public_inputs,
        witness_words: recorder.witness_words,
        gates: recorder.gates,
    })
}

#[derive(Debug, Default)]
struct ShapeRecorder {
    gates: Vec<Gate>,
    wires: usize,
    witness_words: usize,
    public_inputs: Vec<String>,
}

impl ShapeRecorder {
    fn push(&mut self, gate: Gate) -> Wire {
        debug_assert!(gate.defines_wire());
        self.gates.push(gate);
        let wire = Wire(self.wires);
        self.wires += 1;
        wire
    }
}

impl CircuitApi for ShapeRecorder {
    type Word = Wire;
    type Bit = Wire;

    fn load_word(&mut self, _value: B256) -> Wire {
        self.witness_words += 1;
        self.push(Gate::WitnessWord)
    }

    fn load_bit(&mut self, _value: bool) -> Wire {
        self.witness_words += 1;
        self.push(Gate::WitnessBit)
    }

    fn public_input(&mut self, name: &str, _value: B256) -> Wire {
        self.public_inputs.push(name.to_string());
        self.push(Gate::PublicInput {
            name: name.to_string(),
        })
    }

    fn constant(&mut self, value: B256) -> Wire {
        self.push(Gate::Constant { value })
    }

    fn bit(&mut self, value: bool) -> Wire {
        self.push(Gate::ConstantBit { value })
    }

    fn is_equal(&mut self, a: &Wire, b: &Wire) -> Wire {
        self.push(Gate::IsEqual { a: *a, b: *b })
    }

    fn and(&mut self, operands: &[Wire]) -> Wire {
        self.push(Gate::And {
            operands: operands.to_vec(),
        })
    }

    fn or(&mut self, operands: &[Wire]) -> Wire {
        self.push(Gate::Or {
            operands: operands.to_vec(),
        })
    }

    fn not(&mut self, bit: &Wire) -> Wire {
        self.push(Gate::Not { a: *bit })
    }

    fn select(&mut self, cond: &Wire, a: &Wire, b: &Wire) -> Wire {
        self.push(Gate::Select {
            cond: *cond,
            a: *a,
            b: *b,
        })
    }

    fn bit_to_word(&mut self, bit: &Wire) -> Wire {
        self.push(Gate::BitToWord { a: *bit })
    }

    fn add(&mut self, a: &Wire, b: &Wire, _stage: usize) -> Result<Wire> {
        Ok(self.push(Gate::Add { a: *a, b: *b }))
    }

    fn assert_true(&mut self, bit: &Wire, ctx: AssertContext) -> Result<()> {
        self.gates.push(Gate::AssertTrue {
            a: *bit,
            stage: ctx.stage,
        });
        Ok(())
    }

    fn output(&mut self, word: &Wire) {
        self.gates.push(Gate::Output { a: *word });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{swap_descriptor, swap_stream};

    #[test]
    fn test_shape_is_stable() {
        let descriptor = swap_descriptor();
        let first = record(&descriptor).unwrap();
        let second = record(&descriptor).unwrap();
        assert_eq!(first.digest().unwrap(), second.digest().unwrap());
        assert_eq!(first.public_inputs, vec!["Pool", "Swap", "Token"]);
        let outputs = first
            .gates
            .iter()
            .filter(|g| matches!(g, Gate::Output { .. }))
            .count();
        assert_eq!(outputs, 1);
    }

    #[test]
    fn test_shape_ignores_witness_values() {
        let descriptor = swap_descriptor();
        let placeholder = record(&descriptor).unwrap();

        // Synthesizing over a filled stream with real values records the same gates.
        let mut recorder = ShapeRecorder::default();
        let assignment = crate::tests::swap_assignment();
        descriptor
            .synthesize(&mut recorder, &swap_stream(&descriptor), &assignment)
            .unwrap();
        assert_eq!(recorder.gates, placeholder.gates);
        assert_eq!(recorder.witness_words, placeholder.witness_words);
    }

    #[test]
    fn test_witness_words_cover_capacity() {
        let descriptor = swap_descriptor();
        let shape = record(&descriptor).unwrap();
        // Per slot: one active bit plus three words for each of the four fields.
        let per_slot = 1 + 3 * receipt_zk_core::receipt::MAX_FIELDS_PER_RECEIPT;
        assert_eq!(
            shape.witness_words,
            descriptor.allocation().max_receipts * per_slot
        );
    }
}
