//! SHA-256 attestations standing in for a proof system.
//!
//! Keys are derived from the shape digest and the SRS, and a proof is a tag
//! over the verification key and the public witness. Anyone holding the
//! verification key can forge a proof: this checks plumbing, not soundness.

use alloy_primitives::B256;
use sha2::{Digest, Sha256};

use receipt_zk_core::backend::PublicWitness;

/// The 4-byte selector prefix identifying a native attestation.
pub const PROOF_SELECTOR: [u8; 4] = [0x72, 0x7a, 0x6b, 0x01];

/// Serialized proof length: selector + 32-byte tag.
pub const PROOF_LEN: usize = 4 + 32;

/// Length in bytes of one SRS element.
pub const SRS_ELEMENT_LEN: usize = 32;

/// Smallest power of two that fits `constraints`.
pub fn srs_size(constraints: usize) -> usize {
    constraints.max(1).next_power_of_two()
}

/// Deterministic SRS bytes for `size` elements.
pub fn generate_srs(size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(size * SRS_ELEMENT_LEN);
    let mut element: [u8; 32] = Sha256::digest(b"receipt-zk/srs").into();
    for _ in 0..size {
        out.extend_from_slice(&element);
        element = Sha256::digest(element).into();
    }
    out
}

/// Whether cached SRS bytes can serve `size` elements.
pub fn srs_fits(bytes: &[u8], size: usize) -> bool {
    bytes.len() == size * SRS_ELEMENT_LEN
}

pub fn verification_key(shape_digest: B256, srs: &[u8]) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(b"receipt-zk/vk");
    hasher.update(shape_digest);
    hasher.update(Sha256::digest(srs));
    B256::from(<[u8; 32]>::from(hasher.finalize()))
}

/// Proving key bytes: `shape_digest | vk`.
pub fn encode_proving_key(shape_digest: B256, vk: B256) -> Vec<u8> {
    let mut out = shape_digest.to_vec();
    out.extend_from_slice(vk.as_slice());
    out
}

/// Split proving key bytes back into `(shape_digest, vk)`.
pub fn decode_proving_key(bytes: &[u8]) -> Option<(B256, B256)> {
    if bytes.len() != 64 {
        return None;
    }
    Some((B256::from_slice(&bytes[..32]), B256::from_slice(&bytes[32..])))
}

/// Canonical byte encoding of a public witness.
///
/// Layout: `shape_digest | input_commitment | n | (len | name | value)* | m | output*`
/// with counts and lengths as big-endian u32.
pub fn encode_public(public: &PublicWitness) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(public.shape_digest.as_slice());
    out.extend_from_slice(public.input_commitment.as_slice());
    out.extend_from_slice(&(public.public_inputs.len() as u32).to_be_bytes());
    for (name, value) in &public.public_inputs {
        out.extend_from_slice(&(name.len() as u32).to_be_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(value.as_slice());
    }
    out.extend_from_slice(&(public.outputs.len() as u32).to_be_bytes());
    for word in &public.outputs {
        out.extend_from_slice(word.as_slice());
    }
    out
}

/// Serialize a proof: `selector | sha256(vk | public)`.
pub fn attest(vk: B256, public: &PublicWitness) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(vk);
    hasher.update(encode_public(public));
    let mut proof = PROOF_SELECTOR.to_vec();
    proof.extend_from_slice(&hasher.finalize());
    proof
}

/// Validate that a proof has the correct selector and length.
pub fn validate_proof(proof: &[u8]) -> bool {
    proof.len() == PROOF_LEN && proof[..4] == PROOF_SELECTOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn public() -> PublicWitness {
        PublicWitness {
            shape_digest: B256::repeat_byte(1),
            input_commitment: B256::repeat_byte(2),
            public_inputs: BTreeMap::from([("Pool".to_string(), B256::repeat_byte(3))]),
            outputs: vec![B256::with_last_byte(2)],
        }
    }

    #[test]
    fn test_attest_shape() {
        let proof = attest(B256::repeat_byte(9), &public());
        assert_eq!(proof.len(), PROOF_LEN);
        assert!(validate_proof(&proof));
    }

    #[test]
    fn test_attest_binds_public_witness() {
        let vk = B256::repeat_byte(9);
        let mut altered = public();
        altered.outputs[0] = B256::with_last_byte(3);
        assert_ne!(attest(vk, &public()), attest(vk, &altered));
    }

    #[test]
    fn test_validate_proof_wrong_selector() {
        let mut proof = vec![0x00; 4];
        proof.extend_from_slice(&[0u8; 32]);
        assert!(!validate_proof(&proof));
    }

    #[test]
    fn test_validate_proof_wrong_length() {
        let mut proof = PROOF_SELECTOR.to_vec();
        proof.extend_from_slice(&[0u8; 16]);
        assert!(!validate_proof(&proof));
        assert!(!validate_proof(&[]));
    }

    #[test]
    fn test_proving_key_roundtrip() {
        let digest = B256::repeat_byte(1);
        let vk = B256::repeat_byte(2);
        let pk = encode_proving_key(digest, vk);
        assert_eq!(decode_proving_key(&pk), Some((digest, vk)));
        assert_eq!(decode_proving_key(&pk[..10]), None);
    }

    #[test]
    fn test_srs() {
        assert_eq!(srs_size(0), 1);
        assert_eq!(srs_size(1000), 1024);
        let srs = generate_srs(8);
        assert!(srs_fits(&srs, 8));
        assert!(!srs_fits(&srs, 16));
        assert_eq!(srs, generate_srs(8));
    }
}
