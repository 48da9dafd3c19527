use std::path::Path;

use anyhow::Result;

use receipt_zk_core::artifacts;
use receipt_zk_core::backend::ProvingBackend;
use receipt_zk_native::NativeBackend;

use crate::output;
use crate::session::{self, Overrides, Session};
use crate::AppChoice;

/// Verify a proof file against the app's compiled setup.
///
/// The public inputs recorded in the proof must equal the app's constants.
pub async fn run(
    config_path: &Path,
    overrides: &Overrides,
    app: AppChoice,
    proof_path: &Path,
) -> Result<()> {
    output::print_header("receipt-zk verify");

    let config = session::load_config(config_path, overrides)?;
    let session = Session::new(config, app)?;
    let backend = NativeBackend::new();

    output::print_key_value("App", app.as_str());
    output::print_key_value("Proof file", &proof_path.display().to_string());

    output::print_step(1, 2, "Loading setup and proof...");
    let setup = backend
        .read_setup(&session.descriptor, &session.config)
        .await?;
    let file = artifacts::load_proof(proof_path)?;

    let expected: Vec<_> = session
        .app
        .assignment()
        .iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let found: Vec<_> = file
        .public_witness
        .public_inputs
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    if expected != found {
        anyhow::bail!("proof public inputs do not match the {} constants", app.as_str());
    }

    output::print_step(2, 2, "Verifying proof...");
    backend
        .verify(&setup, &file.public_witness, &file.proof)
        .await?;

    output::print_success("Proof verified");
    for (i, word) in file.public_witness.outputs.iter().enumerate() {
        output::print_key_value(&format!("Output {i}"), &word.to_string());
    }

    Ok(())
}
