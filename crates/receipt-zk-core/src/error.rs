//! Unified error types for the receipt-zk toolkit.

use std::path::PathBuf;

use alloy_primitives::B256;
use thiserror::Error;

/// All errors that can occur during receipt-zk operations.
#[derive(Error, Debug)]
pub enum ReceiptZkError {
    // --- Data stream ---

    /// A record was appended to a stream that already holds `capacity` records.
    #[error("data stream capacity exceeded: at most {capacity} records allowed")]
    CapacityExceeded { capacity: usize },

    // --- Receipt data ---

    /// A field reference does not address a field that exists in the referenced log.
    #[error("malformed field reference (log {log_pos}, {area} index {field_index}): {reason}")]
    MalformedFieldReference {
        log_pos: u32,
        area: &'static str,
        field_index: u32,
        reason: String,
    },

    /// A pre-declared field value disagrees with the value found in the fetched log.
    #[error("field mismatch in tx {tx_hash} (log {log_pos}): declared {what} {declared}, found {found}")]
    FieldMismatch {
        tx_hash: B256,
        log_pos: u32,
        what: &'static str,
        declared: String,
        found: String,
    },

    /// The receipt source has no receipt for the requested transaction.
    #[error("receipt not found for tx {0}")]
    ReceiptNotFound(B256),

    // --- Circuit ---

    /// The allocation does not describe a usable circuit shape.
    #[error("invalid allocation: {0}")]
    InvalidAllocation(String),

    /// The pipeline references an unknown stream, constant, or field slot.
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// The assignment binds a constant the circuit never declared.
    #[error("assignment binds undeclared constant '{0}'")]
    UnknownConstant(String),

    /// The assignment leaves a declared constant unbound.
    #[error("assignment is missing a value for constant '{0}'")]
    MissingConstant(String),

    /// An active record failed an `assert_each` stage while solving the witness.
    #[error("assertion failed in stage {stage} for record slot {slot}")]
    AssertionFailed { stage: usize, slot: usize },

    /// A sum aggregation overflowed 256 bits.
    #[error("arithmetic overflow in stage {stage}")]
    ArithmeticOverflow { stage: usize },

    // --- Setup & proof ---

    /// The compiled setup is missing or incomplete under the output directory.
    #[error("setup not found or incomplete: {0}")]
    SetupNotFound(PathBuf),

    /// The persisted setup was compiled from a different circuit shape.
    #[error("setup shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: B256, found: B256 },

    /// The proof does not verify against the verifying key and public witness.
    #[error("proof verification failed: {0}")]
    VerificationFailed(String),

    /// Opaque failure from an external collaborator (compile, prove, verify, fetch).
    #[error("external contract error: {0}")]
    ExternalContract(String),

    // --- Configuration ---

    /// The session configuration file was not found.
    #[error("config file not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON file exists but could not be parsed or written.
    #[error("failed to parse {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // --- General ---

    /// A filesystem I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A catch-all for errors from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Alias for `Result<T, ReceiptZkError>`.
pub type Result<T> = std::result::Result<T, ReceiptZkError>;
