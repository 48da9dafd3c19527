use std::path::Path;

use anyhow::Result;

use receipt_zk_core::artifacts::{self, PROOF_FILE};
use receipt_zk_core::backend::ProvingBackend;
use receipt_zk_core::error::ReceiptZkError;
use receipt_zk_core::source::FixtureSource;
use receipt_zk_native::NativeBackend;

use crate::output;
use crate::session::{self, Overrides, Session};
use crate::AppChoice;

/// Generate a proof over one transaction.
///
/// Loads the compiled setup, builds the circuit input from the fixture,
/// solves the witness, proves and checks the proof, then writes the proof
/// file (default `<out_dir>/proof.json`).
pub async fn run(
    config_path: &Path,
    overrides: &Overrides,
    app: AppChoice,
    fixture: &Path,
    tx: &str,
    output_path: Option<&Path>,
) -> Result<()> {
    output::print_header("receipt-zk prove");

    let config = session::load_config(config_path, overrides)?;
    let tx_hash = session::parse_tx_hash(tx)?;
    let session = Session::new(config, app)?;
    let backend = NativeBackend::new();

    output::print_key_value("App", app.as_str());
    output::print_key_value("Transaction", &tx_hash.to_string());

    output::print_step(1, 3, "Loading setup...");
    let setup = match backend.read_setup(&session.descriptor, &session.config).await {
        Err(ReceiptZkError::SetupNotFound(path)) => anyhow::bail!(
            "no compiled setup ({} missing); run `receipt-zk compile --app {}` first",
            path.display(),
            app.as_str()
        ),
        other => other?,
    };

    output::print_step(2, 3, "Building circuit input...");
    let source = FixtureSource::load(fixture).await?;
    let input = session.build_input(source, tx_hash).await?;

    output::print_step(3, 3, "Generating proof...");
    let spinner = output::spinner("Proving...");
    let result = session.prove(&backend, &setup, &input).await;
    spinner.finish_and_clear();
    let proof_file = result?;

    let path = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| session.config.out_dir.join(PROOF_FILE));
    artifacts::save_proof(&proof_file, &path)?;

    output::print_success("Proof generated and verified");
    output::print_key_value("Proof file", &path.display().to_string());
    output::print_key_value("Proof", &hex::encode(&proof_file.proof.bytes));
    output::print_key_value(
        "Outputs",
        &format!("{}", proof_file.public_witness.outputs.len()),
    );

    Ok(())
}
