//! Development proving backend for receipt-zk.
//!
//! Records the circuit shape through a gate-collecting [`CircuitApi`], solves
//! witnesses natively and attests to public witnesses with SHA-256 tags bound
//! to the shape and a cached SRS stand-in.
//!
//! **Not zero-knowledge and not sound.** The verification key is enough to
//! forge a proof. Use it to exercise the compile / prove / verify lifecycle
//! locally, not to convince anyone of anything.
//!
//! [`CircuitApi`]: receipt_zk_core::api::CircuitApi

mod attest;
pub mod shape;
mod witness;

use std::collections::BTreeMap;
use std::path::Path;

use alloy_primitives::{Bytes, B256};
use async_trait::async_trait;

use receipt_zk_core::artifacts::{
    self, CIRCUIT_FILE, PROVING_KEY_FILE, VERIFICATION_KEY_FILE,
};
use receipt_zk_core::backend::{Proof, ProvingBackend, PublicWitness, SetupArtifacts, Witness};
use receipt_zk_core::circuit::{Assignment, CircuitDescriptor};
use receipt_zk_core::config::SessionConfig;
use receipt_zk_core::error::{ReceiptZkError, Result};
use receipt_zk_core::querier::CircuitInput;

use crate::witness::WitnessSolver;

/// Native development backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Read a file, reporting a missing one as part of an unusable setup.
async fn read_setup_file(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ReceiptZkError::SetupNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Reuse the cached SRS for `size` if present, otherwise generate and cache it.
async fn load_or_generate_srs(path: &Path, size: usize) -> Result<Vec<u8>> {
    if let Ok(bytes) = tokio::fs::read(path).await {
        if attest::srs_fits(&bytes, size) {
            tracing::debug!(path = %path.display(), size, "reusing cached SRS");
            return Ok(bytes);
        }
        tracing::warn!(path = %path.display(), "cached SRS has the wrong size, regenerating");
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = attest::generate_srs(size);
    tokio::fs::write(path, &bytes).await?;
    tracing::info!(path = %path.display(), size, "generated SRS");
    Ok(bytes)
}

#[async_trait]
impl ProvingBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn compile(
        &self,
        descriptor: &CircuitDescriptor,
        config: &SessionConfig,
    ) -> Result<SetupArtifacts> {
        let out_dir = &config.out_dir;
        tokio::fs::create_dir_all(out_dir).await?;

        // Step 1: Record the shape
        let shape = shape::record(descriptor)?;
        let shape_digest = shape.digest()?;
        let circuit = out_dir.join(CIRCUIT_FILE);
        let json = serde_json::to_string_pretty(&shape).map_err(|e| {
            ReceiptZkError::ConfigParse {
                path: circuit.clone(),
                source: e,
            }
        })?;
        tokio::fs::write(&circuit, json).await?;
        tracing::info!(
            constraints = shape.constraint_count(),
            witness_words = shape.witness_words,
            digest = %shape_digest,
            "recorded circuit shape"
        );

        // Step 2: SRS
        let size = attest::srs_size(shape.constraint_count());
        let srs = artifacts::srs_file(&config.srs_dir, size);
        let srs_bytes = load_or_generate_srs(&srs, size).await?;

        // Step 3: Keys
        let vk = attest::verification_key(shape_digest, &srs_bytes);
        let proving_key = out_dir.join(PROVING_KEY_FILE);
        let verification_key = out_dir.join(VERIFICATION_KEY_FILE);
        tokio::fs::write(&proving_key, attest::encode_proving_key(shape_digest, vk)).await?;
        tokio::fs::write(&verification_key, vk.as_slice()).await?;

        // Step 4: Manifest, written last
        let setup = SetupArtifacts {
            backend: self.name().to_string(),
            shape_digest,
            allocation: descriptor.allocation(),
            constraint_count: shape.constraint_count(),
            circuit,
            proving_key,
            verification_key,
            srs,
        };
        let manifest = artifacts::save_setup(&setup, out_dir)?;
        tracing::info!(manifest = %manifest.display(), "setup written");
        Ok(setup)
    }

    async fn read_setup(
        &self,
        descriptor: &CircuitDescriptor,
        config: &SessionConfig,
    ) -> Result<SetupArtifacts> {
        let setup = artifacts::load_setup(&config.out_dir)?;
        if setup.backend != self.name() {
            return Err(ReceiptZkError::ExternalContract(format!(
                "setup in {} was produced by backend '{}'",
                config.out_dir.display(),
                setup.backend
            )));
        }

        let expected = shape::record(descriptor)?.digest()?;
        if setup.shape_digest != expected {
            return Err(ReceiptZkError::ShapeMismatch {
                expected,
                found: setup.shape_digest,
            });
        }
        tracing::debug!(digest = %expected, "setup matches circuit shape");
        Ok(setup)
    }

    async fn new_full_witness(
        &self,
        descriptor: &CircuitDescriptor,
        assignment: &Assignment,
        input: &CircuitInput,
    ) -> Result<(Witness, PublicWitness)> {
        input.verify_commitment()?;
        if input.allocation != descriptor.allocation() {
            return Err(ReceiptZkError::InvalidAllocation(format!(
                "circuit input built for {} receipts, circuit allocates {}",
                input.allocation.max_receipts,
                descriptor.allocation().max_receipts
            )));
        }

        let stream = input.stream()?;
        let mut solver = WitnessSolver::new();
        descriptor.synthesize(&mut solver, &stream, assignment)?;
        let (private, public_inputs, outputs) = solver.finish();

        let public = PublicWitness {
            shape_digest: shape::record(descriptor)?.digest()?,
            input_commitment: input.input_commitment,
            public_inputs: public_inputs.into_iter().collect::<BTreeMap<_, _>>(),
            outputs,
        };
        tracing::info!(
            receipts = input.receipts.len(),
            private_words = private.len(),
            outputs = public.outputs.len(),
            "witness solved"
        );

        let witness = Witness {
            public: public.clone(),
            private,
        };
        Ok((witness, public))
    }

    async fn prove(&self, setup: &SetupArtifacts, witness: &Witness) -> Result<Proof> {
        if witness.public.shape_digest != setup.shape_digest {
            return Err(ReceiptZkError::ShapeMismatch {
                expected: setup.shape_digest,
                found: witness.public.shape_digest,
            });
        }

        let pk = read_setup_file(&setup.proving_key).await?;
        let (key_digest, vk) = attest::decode_proving_key(&pk).ok_or_else(|| {
            ReceiptZkError::ExternalContract(format!(
                "malformed proving key at {}",
                setup.proving_key.display()
            ))
        })?;
        if key_digest != setup.shape_digest {
            return Err(ReceiptZkError::ShapeMismatch {
                expected: setup.shape_digest,
                found: key_digest,
            });
        }

        let bytes = attest::attest(vk, &witness.public);
        tracing::info!(proof = %hex::encode(&bytes), "proof generated");
        Ok(Proof {
            backend: self.name().to_string(),
            bytes: Bytes::from(bytes),
        })
    }

    async fn verify(
        &self,
        setup: &SetupArtifacts,
        public: &PublicWitness,
        proof: &Proof,
    ) -> Result<()> {
        if proof.backend != self.name() {
            return Err(ReceiptZkError::VerificationFailed(format!(
                "proof produced by backend '{}'",
                proof.backend
            )));
        }
        if !attest::validate_proof(&proof.bytes) {
            return Err(ReceiptZkError::VerificationFailed(format!(
                "invalid proof: expected {} bytes with correct selector, got {} bytes",
                attest::PROOF_LEN,
                proof.bytes.len()
            )));
        }

        let vk_bytes = read_setup_file(&setup.verification_key).await?;
        if vk_bytes.len() != 32 {
            return Err(ReceiptZkError::ExternalContract(format!(
                "malformed verification key at {}",
                setup.verification_key.display()
            )));
        }
        let vk = B256::from_slice(&vk_bytes);

        if attest::attest(vk, public) != proof.bytes[..] {
            return Err(ReceiptZkError::VerificationFailed(
                "proof does not attest to this public witness".into(),
            ));
        }
        tracing::info!("proof verified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, Address};
    use receipt_zk_core::circuit::{Allocation, AppCircuit};
    use receipt_zk_core::pipeline::PipelineBuilder;
    use receipt_zk_core::predicate::{Operand, Predicate};
    use receipt_zk_core::receipt::{FieldReference, ReceiptRecord};
    use receipt_zk_core::stream::DataStream;

    const TOKEN: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    const POOL: Address = address!("1385fc1fe0418ea0b4fcf7adc61fc7535ab7f80d");
    const TRANSFER: B256 =
        b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");
    const SWAP: B256 = b256!("c42079f94a6350d7e6235f29174924f928cc2ac818eb64fed8004e115fbcca67");

    pub(crate) struct SwapCircuit {
        pub(crate) capacity: usize,
    }

    impl AppCircuit for SwapCircuit {
        fn allocate(&self) -> Allocation {
            Allocation::receipts(self.capacity)
        }

        fn define(&self, b: &mut PipelineBuilder) -> Result<()> {
            let token = b.constant("Token");
            let pool = b.constant("Pool");
            let swap = b.constant("Swap");
            let transfers = b.filter(
                b.receipts(),
                Predicate::eq(Operand::contract(0), token)
                    .and(Predicate::eq(Operand::event_id(0), Operand::literal(TRANSFER))),
            );
            let swaps = b.filter(
                b.receipts(),
                Predicate::eq(Operand::contract(0), pool)
                    .and(Predicate::eq(Operand::event_id(0), swap)),
            );
            b.assert_each(swaps, Predicate::TRUE);
            b.count(transfers);
            Ok(())
        }
    }

    pub(crate) fn swap_descriptor() -> CircuitDescriptor {
        CircuitDescriptor::new(&SwapCircuit { capacity: 8 }).unwrap()
    }

    pub(crate) fn swap_assignment() -> Assignment {
        Assignment::new()
            .with("Token", TOKEN.into_word())
            .with("Pool", POOL.into_word())
            .with("Swap", SWAP)
    }

    fn record(log_pos: u32, contract: Address, event: B256) -> ReceiptRecord {
        let field = FieldReference::topic(log_pos, 1)
            .unwrap()
            .emitted_by(contract, event)
            .with_value(B256::with_last_byte(log_pos as u8 + 1));
        ReceiptRecord::new(B256::with_last_byte(0x42), vec![field])
            .unwrap()
            .with_block_number(18_446_788)
    }

    fn records() -> Vec<ReceiptRecord> {
        vec![
            record(0, TOKEN, TRANSFER),
            record(1, TOKEN, TRANSFER),
            record(2, POOL, SWAP),
        ]
    }

    pub(crate) fn swap_stream(descriptor: &CircuitDescriptor) -> DataStream {
        let mut stream = descriptor.new_stream();
        for r in records() {
            stream.append(r).unwrap();
        }
        stream
    }

    fn input() -> CircuitInput {
        CircuitInput::new(1, Allocation::receipts(8), records()).unwrap()
    }

    fn config(dir: &Path) -> SessionConfig {
        SessionConfig::new(1, dir.join("out"), dir.join("srs"))
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let backend = NativeBackend::new();
        let descriptor = swap_descriptor();

        let compiled = backend.compile(&descriptor, &config).await.unwrap();
        let setup = backend.read_setup(&descriptor, &config).await.unwrap();
        assert_eq!(compiled, setup);

        let (witness, public) = backend
            .new_full_witness(&descriptor, &swap_assignment(), &input())
            .await
            .unwrap();
        assert_eq!(public.outputs, vec![B256::with_last_byte(2)]);
        assert_eq!(public.public_inputs.len(), 3);

        let proof = backend.prove(&setup, &witness).await.unwrap();
        backend.verify(&setup, &public, &proof).await.unwrap();
    }

    #[tokio::test]
    async fn test_compile_is_deterministic_and_reuses_srs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let backend = NativeBackend::new();
        let descriptor = swap_descriptor();

        let first = backend.compile(&descriptor, &config).await.unwrap();
        let modified = std::fs::metadata(&first.srs).unwrap().modified().unwrap();
        let second = backend.compile(&descriptor, &config).await.unwrap();
        assert_eq!(first.shape_digest, second.shape_digest);
        assert_eq!(
            std::fs::metadata(&second.srs).unwrap().modified().unwrap(),
            modified
        );
        assert_eq!(
            std::fs::read(&first.verification_key).unwrap(),
            std::fs::read(&second.verification_key).unwrap()
        );
    }

    #[tokio::test]
    async fn test_read_setup_rejects_other_shape() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let backend = NativeBackend::new();
        backend.compile(&swap_descriptor(), &config).await.unwrap();

        let bigger = CircuitDescriptor::new(&SwapCircuit { capacity: 16 }).unwrap();
        let err = backend.read_setup(&bigger, &config).await.unwrap_err();
        assert!(matches!(err, ReceiptZkError::ShapeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_read_setup_requires_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let backend = NativeBackend::new();
        let descriptor = swap_descriptor();

        let err = backend.read_setup(&descriptor, &config).await.unwrap_err();
        assert!(matches!(err, ReceiptZkError::SetupNotFound(_)));

        let setup = backend.compile(&descriptor, &config).await.unwrap();
        std::fs::remove_file(&setup.verification_key).unwrap();
        let err = backend.read_setup(&descriptor, &config).await.unwrap_err();
        assert!(matches!(err, ReceiptZkError::SetupNotFound(p) if p == setup.verification_key));
    }

    #[tokio::test]
    async fn test_setup_compiles_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let backend = NativeBackend::new();
        let descriptor = swap_descriptor();
        let setup = backend.setup(&descriptor, &config).await.unwrap();
        assert!(config.out_dir.join(artifacts::MANIFEST_FILE).is_file());
        assert_eq!(backend.setup(&descriptor, &config).await.unwrap(), setup);
    }

    #[tokio::test]
    async fn test_verify_rejects_altered_public_witness() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let backend = NativeBackend::new();
        let descriptor = swap_descriptor();
        let setup = backend.compile(&descriptor, &config).await.unwrap();
        let (witness, public) = backend
            .new_full_witness(&descriptor, &swap_assignment(), &input())
            .await
            .unwrap();
        let proof = backend.prove(&setup, &witness).await.unwrap();

        let mut altered = public.clone();
        altered.outputs[0] = B256::with_last_byte(5);
        let err = backend.verify(&setup, &altered, &proof).await.unwrap_err();
        assert!(matches!(err, ReceiptZkError::VerificationFailed(_)));

        let mut altered = public;
        altered.public_inputs.insert("Pool".into(), TOKEN.into_word());
        assert!(backend.verify(&setup, &altered, &proof).await.is_err());
    }

    #[tokio::test]
    async fn test_witness_requires_every_constant() {
        let backend = NativeBackend::new();
        let descriptor = swap_descriptor();
        let missing = Assignment::new().with("Token", TOKEN.into_word());
        let err = backend
            .new_full_witness(&descriptor, &missing, &input())
            .await
            .unwrap_err();
        assert!(matches!(err, ReceiptZkError::MissingConstant(_)));
    }

    #[tokio::test]
    async fn test_witness_rejects_wrong_allocation() {
        let backend = NativeBackend::new();
        let descriptor = swap_descriptor();
        let input = CircuitInput::new(1, Allocation::receipts(4), records()).unwrap();
        let err = backend
            .new_full_witness(&descriptor, &swap_assignment(), &input)
            .await
            .unwrap_err();
        assert!(matches!(err, ReceiptZkError::InvalidAllocation(_)));
    }
}
