//! Declarative filter / assert / aggregate pipeline over the receipt stream.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. Stage operands name
//! streams by [`StreamId`]: [`StreamId::RECEIPTS`] is the input stream and
//! every `filter` stage declares a new one. Streams keep their full capacity;
//! filtering only clears `active` bits, so padding stays inert and order is
//! preserved.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::api::{AssertContext, CircuitApi};
use crate::error::{ReceiptZkError, Result};
use crate::predicate::{Operand, Predicate, StreamItem};

/// Handle to a stream declared in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(usize);

impl StreamId {
    /// The receipt stream supplied by the circuit input.
    pub const RECEIPTS: StreamId = StreamId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One pipeline operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "camelCase")]
pub enum Stage {
    /// Declares a new stream: `source` narrowed to items matching `predicate`.
    Filter {
        source: StreamId,
        predicate: Predicate,
    },
    /// Every active item of `stream` must satisfy `assertion`.
    AssertEach {
        stream: StreamId,
        assertion: Predicate,
    },
    /// Output the number of active items.
    Count { stream: StreamId },
    /// Output the sum of `operand` over active items.
    Sum { stream: StreamId, operand: Operand },
}

/// A stream inside the circuit: exactly `capacity` items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitStream<W, B> {
    items: Vec<StreamItem<W, B>>,
}

impl<W, B> CircuitStream<W, B> {
    pub fn new(items: Vec<StreamItem<W, B>>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[StreamItem<W, B>] {
        &self.items
    }

}

impl<W> CircuitStream<W, bool> {
    /// Slot indices whose item is active. Only meaningful for solved streams.
    pub fn active_slots(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.active)
            .map(|(slot, _)| slot)
            .collect()
    }
}

/// Narrow `stream` to the items satisfying `predicate`.
pub fn filter<A: CircuitApi>(
    api: &mut A,
    stream: &CircuitStream<A::Word, A::Bit>,
    predicate: &Predicate,
    bindings: &BTreeMap<String, A::Word>,
) -> Result<CircuitStream<A::Word, A::Bit>> {
    let items = stream
        .items
        .iter()
        .map(|item| {
            let matched = predicate.evaluate(api, item, bindings)?;
            let active = api.and(&[item.active.clone(), matched]);
            Ok(StreamItem {
                active,
                fields: item.fields.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CircuitStream { items })
}

/// Constrain every active item of `stream` to satisfy `assertion`.
///
/// Inactive items are exempt: each slot asserts `!active || assertion`.
pub fn assert_each<A: CircuitApi>(
    api: &mut A,
    stream: &CircuitStream<A::Word, A::Bit>,
    assertion: &Predicate,
    bindings: &BTreeMap<String, A::Word>,
    stage: usize,
) -> Result<()> {
    for (slot, item) in stream.items.iter().enumerate() {
        let holds = assertion.evaluate(api, item, bindings)?;
        let inactive = api.not(&item.active);
        let satisfied = api.or(&[inactive, holds]);
        api.assert_true(&satisfied, AssertContext { stage, slot })?;
    }
    Ok(())
}

/// Number of active items, as a word.
pub fn count<A: CircuitApi>(
    api: &mut A,
    stream: &CircuitStream<A::Word, A::Bit>,
    stage: usize,
) -> Result<A::Word> {
    let mut total = api.constant(Default::default());
    for item in &stream.items {
        let one = api.bit_to_word(&item.active);
        total = api.add(&total, &one, stage)?;
    }
    Ok(total)
}

/// Sum of `operand` over the active items.
pub fn sum<A: CircuitApi>(
    api: &mut A,
    stream: &CircuitStream<A::Word, A::Bit>,
    operand: &Operand,
    bindings: &BTreeMap<String, A::Word>,
    stage: usize,
) -> Result<A::Word> {
    let zero = api.constant(Default::default());
    let mut total = zero.clone();
    for item in &stream.items {
        let word = operand.load(api, item, bindings)?;
        let term = api.select(&item.active, &word, &zero);
        total = api.add(&total, &term, stage)?;
    }
    Ok(total)
}

/// Ordered list of stages with the number of streams they declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    stages: Vec<Stage>,
    stream_count: usize,
}

impl Pipeline {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of streams, including the receipt stream.
    pub fn stream_count(&self) -> usize {
        self.stream_count
    }

    /// Check stream handles and operands against the declared constants.
    pub fn validate(&self, constants: &BTreeSet<String>) -> Result<()> {
        let mut declared = 1;
        for (index, stage) in self.stages.iter().enumerate() {
            let (stream, predicate, operand) = match stage {
                Stage::Filter { source, predicate } => (*source, Some(predicate), None),
                Stage::AssertEach { stream, assertion } => (*stream, Some(assertion), None),
                Stage::Count { stream } => (*stream, None, None),
                Stage::Sum { stream, operand } => (*stream, None, Some(operand)),
            };
            if stream.0 >= declared {
                return Err(ReceiptZkError::InvalidPipeline(format!(
                    "stage {index} reads stream {} before it is declared",
                    stream.0
                )));
            }
            if let Some(predicate) = predicate {
                predicate.validate(constants)?;
            }
            if let Some(operand) = operand {
                operand.validate(constants)?;
            }
            if matches!(stage, Stage::Filter { .. }) {
                declared += 1;
            }
        }
        if declared != self.stream_count {
            return Err(ReceiptZkError::InvalidPipeline(format!(
                "stream count {} does not match {declared} declared streams",
                self.stream_count
            )));
        }
        Ok(())
    }

    /// Run every stage over `receipts`, returning all streams by [`StreamId`].
    pub fn run<A: CircuitApi>(
        &self,
        api: &mut A,
        receipts: CircuitStream<A::Word, A::Bit>,
        bindings: &BTreeMap<String, A::Word>,
    ) -> Result<Vec<CircuitStream<A::Word, A::Bit>>> {
        let mut streams = Vec::with_capacity(self.stream_count);
        streams.push(receipts);

        for (index, stage) in self.stages.iter().enumerate() {
            match stage {
                Stage::Filter { source, predicate } => {
                    let narrowed =
                        filter(api, stream_at(&streams, *source, index)?, predicate, bindings)?;
                    streams.push(narrowed);
                }
                Stage::AssertEach { stream, assertion } => {
                    let input = stream_at(&streams, *stream, index)?;
                    assert_each(api, input, assertion, bindings, index)?;
                }
                Stage::Count { stream } => {
                    let total = count(api, stream_at(&streams, *stream, index)?, index)?;
                    api.output(&total);
                }
                Stage::Sum { stream, operand } => {
                    let input = stream_at(&streams, *stream, index)?;
                    let total = sum(api, input, operand, bindings, index)?;
                    api.output(&total);
                }
            }
            tracing::trace!(stage = index, "pipeline stage applied");
        }

        Ok(streams)
    }
}

fn stream_at<W, B>(
    streams: &[CircuitStream<W, B>],
    id: StreamId,
    stage: usize,
) -> Result<&CircuitStream<W, B>> {
    streams.get(id.0).ok_or_else(|| {
        ReceiptZkError::InvalidPipeline(format!(
            "stage {stage} reads stream {} before it is declared",
            id.0
        ))
    })
}

/// Collects stages and constant declarations while a circuit is defined.
#[derive(Debug)]
pub struct PipelineBuilder {
    pipeline: Pipeline,
    constants: BTreeSet<String>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            pipeline: Pipeline {
                stages: Vec::new(),
                stream_count: 1,
            },
            constants: BTreeSet::new(),
        }
    }

    /// The receipt stream of the circuit input.
    pub fn receipts(&self) -> StreamId {
        StreamId::RECEIPTS
    }

    /// Declare a named constant bound per proof by the assignment.
    pub fn constant(&mut self, name: impl Into<String>) -> Operand {
        let name = name.into();
        self.constants.insert(name.clone());
        Operand::Constant(name)
    }

    pub fn filter(&mut self, source: StreamId, predicate: Predicate) -> StreamId {
        let id = StreamId(self.pipeline.stream_count);
        self.pipeline.stream_count += 1;
        self.pipeline.stages.push(Stage::Filter { source, predicate });
        id
    }

    pub fn assert_each(&mut self, stream: StreamId, assertion: Predicate) {
        self.pipeline
            .stages
            .push(Stage::AssertEach { stream, assertion });
    }

    pub fn count(&mut self, stream: StreamId) {
        self.pipeline.stages.push(Stage::Count { stream });
    }

    pub fn sum(&mut self, stream: StreamId, operand: Operand) {
        self.pipeline.stages.push(Stage::Sum { stream, operand });
    }

    /// Validate and return the pipeline with its declared constants.
    pub fn finish(self) -> Result<(Pipeline, BTreeSet<String>)> {
        self.pipeline.validate(&self.constants)?;
        Ok((self.pipeline, self.constants))
    }
}
