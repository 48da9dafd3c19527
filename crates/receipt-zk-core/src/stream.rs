//! Fixed-capacity receipt stream.
//!
//! A [`DataStream`] always presents exactly `capacity` slots to the pipeline:
//! the appended records in insertion order, then padding. Padding never
//! satisfies a filter, so one compiled circuit serves any number of records
//! up to the capacity.

use crate::error::{ReceiptZkError, Result};
use crate::receipt::ReceiptRecord;

/// Ordered, capacity-bounded collection of receipt records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStream {
    capacity: usize,
    records: Vec<ReceiptRecord>,
}

/// One position of a stream as seen by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot<'a> {
    Record(&'a ReceiptRecord),
    Padding,
}

impl<'a> Slot<'a> {
    pub fn record(&self) -> Option<&'a ReceiptRecord> {
        match self {
            Slot::Record(record) => Some(record),
            Slot::Padding => None,
        }
    }

    pub fn is_padding(&self) -> bool {
        matches!(self, Slot::Padding)
    }
}

impl DataStream {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            records: Vec::with_capacity(capacity),
        }
    }

    /// Append a record; fails instead of dropping once the stream is full.
    ///
    /// The record's field references are checked again here, since records
    /// can be built field by field or read back from an input blob.
    pub fn append(&mut self, record: ReceiptRecord) -> Result<()> {
        record.validate()?;
        if self.records.len() == self.capacity {
            return Err(ReceiptZkError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Restartable view over all `capacity` slots.
    pub fn as_sequence(&self) -> Sequence<'_> {
        Sequence {
            records: &self.records,
            capacity: self.capacity,
            pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ReceiptRecord] {
        &self.records
    }
}

/// Lazy iterator over the slots of a [`DataStream`].
#[derive(Debug, Clone)]
pub struct Sequence<'a> {
    records: &'a [ReceiptRecord],
    capacity: usize,
    pos: usize,
}

impl<'a> Iterator for Sequence<'a> {
    type Item = Slot<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.capacity {
            return None;
        }
        let slot = match self.records.get(self.pos) {
            Some(record) => Slot::Record(record),
            None => Slot::Padding,
        };
        self.pos += 1;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.capacity.saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Sequence<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::FieldReference;
    use alloy_primitives::B256;

    fn record(byte: u8) -> ReceiptRecord {
        ReceiptRecord {
            tx_hash: B256::with_last_byte(byte),
            ..Default::default()
        }
    }

    #[test]
    fn test_append_beyond_capacity_fails() {
        let mut stream = DataStream::with_capacity(2);
        stream.append(record(1)).unwrap();
        stream.append(record(2)).unwrap();
        let err = stream.append(record(3)).unwrap_err();
        assert!(matches!(err, ReceiptZkError::CapacityExceeded { capacity: 2 }));
        // nothing dropped or replaced
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.records()[1], record(2));
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut stream = DataStream::with_capacity(0);
        assert!(stream.append(record(1)).is_err());
        assert_eq!(stream.as_sequence().count(), 0);
    }

    #[test]
    fn test_sequence_pads_to_capacity() {
        let mut stream = DataStream::with_capacity(4);
        stream.append(record(1)).unwrap();
        let slots: Vec<_> = stream.as_sequence().collect();
        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0].record(), Some(&record(1)));
        assert!(slots[1..].iter().all(Slot::is_padding));
    }

    #[test]
    fn test_sequence_is_restartable() {
        let mut stream = DataStream::with_capacity(3);
        stream.append(record(1)).unwrap();
        stream.append(record(2)).unwrap();
        let first: Vec<_> = stream.as_sequence().collect();
        let second: Vec<_> = stream.as_sequence().collect();
        assert_eq!(first, second);

        let seq = stream.as_sequence();
        let cloned: Vec<_> = seq.clone().collect();
        assert_eq!(cloned, seq.collect::<Vec<_>>());
    }

    #[test]
    fn test_append_rejects_unchecked_record() {
        let mut stream = DataStream::with_capacity(2);
        let field = FieldReference::topic(0, 1).unwrap();
        let mut fields = vec![field.clone(); 4];
        fields.push(FieldReference {
            field_index: 9,
            ..field
        });
        let oversized = ReceiptRecord {
            tx_hash: B256::with_last_byte(1),
            block_number: None,
            fields,
        };
        let err = stream.append(oversized).unwrap_err();
        assert!(matches!(err, ReceiptZkError::MalformedFieldReference { .. }));

        let bad_topic = ReceiptRecord {
            tx_hash: B256::with_last_byte(2),
            block_number: None,
            fields: vec![FieldReference {
                field_index: 4,
                ..FieldReference::topic(0, 1).unwrap()
            }],
        };
        assert!(matches!(
            stream.append(bad_topic),
            Err(ReceiptZkError::MalformedFieldReference { field_index: 4, .. })
        ));
        assert!(stream.is_empty());
    }
}
