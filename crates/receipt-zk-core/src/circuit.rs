//! Circuit descriptor: allocation + pipeline + declared constants.
//!
//! An application implements [`AppCircuit`] once. The resulting
//! [`CircuitDescriptor`] is the circuit *shape*: it is compiled once and
//! reused for every proof. The per-proof values of its named constants live
//! in a separate [`Assignment`]; compiling binds zero placeholders instead,
//! so no assignment value can leak into the shape.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::api::{CircuitApi, NativeApi};
use crate::error::{ReceiptZkError, Result};
use crate::pipeline::{CircuitStream, Pipeline, PipelineBuilder};
use crate::predicate::{LoadedField, StreamItem};
use crate::receipt::MAX_FIELDS_PER_RECEIPT;
use crate::stream::DataStream;

/// Upper bounds that fix the compiled circuit's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub max_receipts: usize,
    pub max_storage_slots: usize,
    pub max_transactions: usize,
}

impl Allocation {
    /// A receipts-only allocation.
    pub fn receipts(max_receipts: usize) -> Self {
        Self {
            max_receipts,
            max_storage_slots: 0,
            max_transactions: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_receipts == 0 {
            return Err(ReceiptZkError::InvalidAllocation(
                "max_receipts must be non-zero (only receipt queries are supported)".into(),
            ));
        }
        Ok(())
    }
}

/// An application-defined circuit.
pub trait AppCircuit {
    /// Capacity bounds of the circuit.
    fn allocate(&self) -> Allocation;

    /// Declare constants and pipeline stages.
    fn define(&self, builder: &mut PipelineBuilder) -> Result<()>;
}

/// Concrete values for a circuit's named constants, supplied per proof.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment {
    values: BTreeMap<String, B256>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<B256>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<B256>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<B256> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, B256)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// The circuit input as seen inside the circuit.
///
/// Only receipt queries are modeled; storage and transaction capacities are
/// part of the allocation but carry no records.
#[derive(Debug, Clone)]
pub struct DataInput<W, B> {
    pub receipts: CircuitStream<W, B>,
}

/// Result of solving a descriptor natively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Active slots of each filtered stream, in declaration order.
    pub filtered: Vec<Vec<usize>>,
    /// Public inputs bound from the assignment, sorted by name.
    pub public_inputs: Vec<(String, B256)>,
    /// Aggregation outputs in stage order.
    pub outputs: Vec<B256>,
}

/// Compiled-once description of a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DescriptorParts")]
pub struct CircuitDescriptor {
    allocation: Allocation,
    constants: BTreeSet<String>,
    pipeline: Pipeline,
}

/// Serialized form of a [`CircuitDescriptor`], validated on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorParts {
    allocation: Allocation,
    constants: BTreeSet<String>,
    pipeline: Pipeline,
}

impl TryFrom<DescriptorParts> for CircuitDescriptor {
    type Error = ReceiptZkError;

    fn try_from(parts: DescriptorParts) -> Result<Self> {
        parts.allocation.validate()?;
        parts.pipeline.validate(&parts.constants)?;
        Ok(Self {
            allocation: parts.allocation,
            constants: parts.constants,
            pipeline: parts.pipeline,
        })
    }
}

impl CircuitDescriptor {
    /// Run `circuit.define` and validate the result.
    pub fn new<C: AppCircuit + ?Sized>(circuit: &C) -> Result<Self> {
        let allocation = circuit.allocate();
        allocation.validate()?;

        let mut builder = PipelineBuilder::new();
        circuit.define(&mut builder)?;
        let (pipeline, constants) = builder.finish()?;

        tracing::debug!(
            max_receipts = allocation.max_receipts,
            stages = pipeline.stages().len(),
            constants = constants.len(),
            "circuit descriptor defined"
        );

        Ok(Self {
            allocation,
            constants,
            pipeline,
        })
    }

    pub fn allocation(&self) -> Allocation {
        self.allocation
    }

    pub fn constants(&self) -> &BTreeSet<String> {
        &self.constants
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// An empty stream sized to this circuit's receipt capacity.
    pub fn new_stream(&self) -> DataStream {
        DataStream::with_capacity(self.allocation.max_receipts)
    }

    /// Zero values for every declared constant, used when compiling the shape.
    pub fn placeholder_assignment(&self) -> Assignment {
        self.constants
            .iter()
            .fold(Assignment::new(), |a, name| a.with(name.clone(), B256::ZERO))
    }

    /// The assignment must bind exactly the declared constants.
    pub fn check_assignment(&self, assignment: &Assignment) -> Result<()> {
        if let Some((name, _)) = assignment
            .iter()
            .find(|(name, _)| !self.constants.contains(*name))
        {
            return Err(ReceiptZkError::UnknownConstant(name.to_string()));
        }
        if let Some(name) = self
            .constants
            .iter()
            .find(|name| assignment.get(name).is_none())
        {
            return Err(ReceiptZkError::MissingConstant(name.clone()));
        }
        Ok(())
    }

    /// Load `stream` into the circuit as private witness data.
    pub fn load_input<A: CircuitApi>(
        &self,
        api: &mut A,
        stream: &DataStream,
    ) -> Result<DataInput<A::Word, A::Bit>> {
        if stream.capacity() != self.allocation.max_receipts {
            return Err(ReceiptZkError::InvalidAllocation(format!(
                "stream capacity {} does not match allocated {} receipts",
                stream.capacity(),
                self.allocation.max_receipts
            )));
        }

        let items = stream
            .as_sequence()
            .map(|slot| {
                let record = slot.record();
                let active = api.load_bit(!slot.is_padding());
                let fields = (0..MAX_FIELDS_PER_RECEIPT)
                    .map(|i| {
                        let field = record.and_then(|r| r.fields.get(i));
                        LoadedField {
                            contract: api
                                .load_word(field.map(|f| f.contract.into_word()).unwrap_or_default()),
                            event_id: api.load_word(field.map(|f| f.event_id).unwrap_or_default()),
                            value: api.load_word(field.map(|f| f.value).unwrap_or_default()),
                        }
                    })
                    .collect();
                StreamItem { active, fields }
            })
            .collect();

        Ok(DataInput {
            receipts: CircuitStream::new(items),
        })
    }

    /// Bind constants and run the pipeline through `api`.
    ///
    /// Returns every stream of the pipeline, indexed by stream id.
    pub fn synthesize<A: CircuitApi>(
        &self,
        api: &mut A,
        stream: &DataStream,
        assignment: &Assignment,
    ) -> Result<Vec<CircuitStream<A::Word, A::Bit>>> {
        self.check_assignment(assignment)?;
        let input = self.load_input(api, stream)?;

        let mut bindings = BTreeMap::new();
        for name in &self.constants {
            let value = assignment
                .get(name)
                .ok_or_else(|| ReceiptZkError::MissingConstant(name.clone()))?;
            bindings.insert(name.clone(), api.public_input(name, value));
        }

        self.pipeline.run(api, input.receipts, &bindings)
    }

    /// Solve the circuit natively over `stream` with `assignment`.
    pub fn check(&self, stream: &DataStream, assignment: &Assignment) -> Result<Evaluation> {
        let mut api = NativeApi::new();
        let streams = self.synthesize(&mut api, stream, assignment)?;
        let filtered = streams
            .iter()
            .skip(1)
            .map(CircuitStream::active_slots)
            .collect();
        let public_inputs = api.public_inputs().to_vec();
        Ok(Evaluation {
            filtered,
            public_inputs,
            outputs: api.into_outputs(),
        })
    }
}
