use std::collections::BTreeMap;
use std::path::PathBuf;

use alloy_primitives::{Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::circuit::{Allocation, Assignment, CircuitDescriptor};
use crate::config::SessionConfig;
use crate::error::{ReceiptZkError, Result};
use crate::querier::CircuitInput;

/// Artifacts produced by the compile step, described by `setup.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupArtifacts {
    /// Backend that produced the setup.
    pub backend: String,
    /// Digest of the recorded circuit shape. Keys are bound to it.
    pub shape_digest: B256,
    pub allocation: Allocation,
    /// Number of constraints in the recorded shape.
    pub constraint_count: usize,
    /// Path to the recorded shape (`circuit.json`).
    pub circuit: PathBuf,
    pub proving_key: PathBuf,
    pub verification_key: PathBuf,
    /// Path to the cached structured reference string.
    pub srs: PathBuf,
}

impl SetupArtifacts {
    /// Every file the manifest points at must exist.
    pub fn ensure_files(&self) -> Result<()> {
        for path in [
            &self.circuit,
            &self.proving_key,
            &self.verification_key,
            &self.srs,
        ] {
            if !path.is_file() {
                return Err(ReceiptZkError::SetupNotFound(path.clone()));
            }
        }
        Ok(())
    }
}

/// Values a verifier sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicWitness {
    pub shape_digest: B256,
    /// Commitment of the circuit input the witness was built from.
    pub input_commitment: B256,
    /// Constant values bound from the assignment.
    pub public_inputs: BTreeMap<String, B256>,
    /// Aggregation outputs in stage order.
    pub outputs: Vec<B256>,
}

/// Full witness: the public part plus every private word loaded into the circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub public: PublicWitness,
    pub private: Vec<B256>,
}

/// Proof bytes as produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub backend: String,
    pub bytes: Bytes,
}

/// Every proving backend must implement this trait.
///
/// The lifecycle mirrors a SNARK toolchain: compile a descriptor once, then
/// for each proof build a witness, prove, and verify against the public part.
#[async_trait]
pub trait ProvingBackend: Send + Sync {
    /// Short identifier, recorded in manifests and proofs.
    fn name(&self) -> &'static str;

    /// Record the circuit shape, run setup and persist artifacts under `config.out_dir`.
    async fn compile(
        &self,
        descriptor: &CircuitDescriptor,
        config: &SessionConfig,
    ) -> Result<SetupArtifacts>;

    /// Load previously compiled artifacts for `descriptor`.
    ///
    /// Fails with `SetupNotFound` when any artifact is missing and with
    /// `ShapeMismatch` when they were compiled from a different shape.
    async fn read_setup(
        &self,
        descriptor: &CircuitDescriptor,
        config: &SessionConfig,
    ) -> Result<SetupArtifacts>;

    /// Solve the circuit over `input` with `assignment`.
    async fn new_full_witness(
        &self,
        descriptor: &CircuitDescriptor,
        assignment: &Assignment,
        input: &CircuitInput,
    ) -> Result<(Witness, PublicWitness)>;

    async fn prove(&self, setup: &SetupArtifacts, witness: &Witness) -> Result<Proof>;

    async fn verify(
        &self,
        setup: &SetupArtifacts,
        public: &PublicWitness,
        proof: &Proof,
    ) -> Result<()>;

    /// Read the setup, compiling first if none has been persisted yet.
    async fn setup(
        &self,
        descriptor: &CircuitDescriptor,
        config: &SessionConfig,
    ) -> Result<SetupArtifacts> {
        match self.read_setup(descriptor, config).await {
            Err(ReceiptZkError::SetupNotFound(path)) => {
                tracing::info!(missing = %path.display(), "no usable setup, compiling");
                self.compile(descriptor, config).await
            }
            other => other,
        }
    }
}
