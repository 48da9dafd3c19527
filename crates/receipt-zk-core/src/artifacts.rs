//! Persistence for compiled setups and proofs between CLI commands.
//!
//! `compile` writes the shape, both keys and the SRS cache, then the
//! `setup.json` manifest last; a setup counts as present only once the
//! manifest exists. `prove` writes a [`ProofFile`] that `verify` reads back.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::{Proof, PublicWitness, SetupArtifacts};
use crate::error::{ReceiptZkError, Result};

pub const MANIFEST_FILE: &str = "setup.json";
pub const CIRCUIT_FILE: &str = "circuit.json";
pub const PROVING_KEY_FILE: &str = "pk.bin";
pub const VERIFICATION_KEY_FILE: &str = "vk.bin";
pub const PROOF_FILE: &str = "proof.json";

/// Cache file for an SRS supporting `size` constraints.
pub fn srs_file(srs_dir: &Path, size: usize) -> PathBuf {
    srs_dir.join(format!("srs-{size}.bin"))
}

/// Save the setup manifest to `<out_dir>/setup.json`.
///
/// Call only after every artifact it points at has been written.
pub fn save_setup(setup: &SetupArtifacts, out_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(setup).map_err(|e| ReceiptZkError::ConfigParse {
        path: path.clone(),
        source: e,
    })?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Load the setup manifest and check that its files exist.
pub fn load_setup(out_dir: &Path) -> Result<SetupArtifacts> {
    let path = out_dir.join(MANIFEST_FILE);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReceiptZkError::SetupNotFound(path));
        }
        Err(e) => return Err(e.into()),
    };
    let setup: SetupArtifacts =
        serde_json::from_str(&contents).map_err(|e| ReceiptZkError::ConfigParse {
            path: path.clone(),
            source: e,
        })?;
    setup.ensure_files()?;
    Ok(setup)
}

/// A proof together with the public witness it attests to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofFile {
    pub proof: Proof,
    pub public_witness: PublicWitness,
}

pub fn save_proof(file: &ProofFile, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(file).map_err(|e| ReceiptZkError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_proof(path: &Path) -> Result<ProofFile> {
    let contents = std::fs::read_to_string(path).map_err(|e| ReceiptZkError::ConfigNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| ReceiptZkError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Allocation;
    use alloy_primitives::{Bytes, B256};
    use std::collections::BTreeMap;

    fn setup_in(dir: &Path) -> SetupArtifacts {
        SetupArtifacts {
            backend: "native".into(),
            shape_digest: B256::repeat_byte(1),
            allocation: Allocation::receipts(32),
            constraint_count: 10,
            circuit: dir.join(CIRCUIT_FILE),
            proving_key: dir.join(PROVING_KEY_FILE),
            verification_key: dir.join(VERIFICATION_KEY_FILE),
            srs: srs_file(&dir.join("srs"), 16),
        }
    }

    fn write_files(setup: &SetupArtifacts) {
        for path in [
            &setup.circuit,
            &setup.proving_key,
            &setup.verification_key,
            &setup.srs,
        ] {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"x").unwrap();
        }
    }

    #[test]
    fn test_setup_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let setup = setup_in(dir.path());
        write_files(&setup);
        save_setup(&setup, dir.path()).unwrap();
        assert_eq!(load_setup(dir.path()).unwrap(), setup);
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_setup(dir.path()).unwrap_err();
        assert!(matches!(err, ReceiptZkError::SetupNotFound(p) if p.ends_with(MANIFEST_FILE)));
    }

    #[test]
    fn test_missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let setup = setup_in(dir.path());
        write_files(&setup);
        save_setup(&setup, dir.path()).unwrap();
        std::fs::remove_file(&setup.proving_key).unwrap();
        let err = load_setup(dir.path()).unwrap_err();
        assert!(matches!(err, ReceiptZkError::SetupNotFound(p) if p.ends_with(PROVING_KEY_FILE)));
    }

    #[test]
    fn test_proof_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(PROOF_FILE);
        let file = ProofFile {
            proof: Proof {
                backend: "native".into(),
                bytes: Bytes::from(vec![0xab; 32]),
            },
            public_witness: PublicWitness {
                shape_digest: B256::repeat_byte(1),
                input_commitment: B256::repeat_byte(2),
                public_inputs: BTreeMap::from([("Pool".to_string(), B256::repeat_byte(3))]),
                outputs: vec![B256::with_last_byte(2)],
            },
        };
        save_proof(&file, &path).unwrap();
        assert_eq!(load_proof(&path).unwrap(), file);
    }
}
