use std::path::Path;

use anyhow::Result;

use receipt_zk_core::backend::ProvingBackend;
use receipt_zk_native::NativeBackend;

use crate::output;
use crate::session::{self, Overrides, Session};
use crate::AppChoice;

/// Compile the app circuit and write its setup.
///
/// Records the shape, fetches (or reuses) the SRS and writes both keys and
/// the `setup.json` manifest under the session's output directory.
pub async fn run(config_path: &Path, overrides: &Overrides, app: AppChoice) -> Result<()> {
    output::print_header("receipt-zk compile");

    let config = session::load_config(config_path, overrides)?;
    let session = Session::new(config, app)?;
    let backend = NativeBackend::new();

    output::print_key_value("App", app.as_str());
    output::print_key_value("Backend", backend.name());
    output::print_key_value("Output", &session.config.out_dir.display().to_string());

    let spinner = output::spinner("Compiling circuit...");
    let result = backend.compile(&session.descriptor, &session.config).await;
    spinner.finish_and_clear();
    let setup = result?;

    output::print_success("Circuit compiled");
    output::print_key_value("Shape digest", &setup.shape_digest.to_string());
    output::print_key_value("Constraints", &setup.constraint_count.to_string());
    output::print_key_value("Proving key", &setup.proving_key.display().to_string());
    output::print_key_value(
        "Verification key",
        &setup.verification_key.display().to_string(),
    );
    output::print_key_value("SRS", &setup.srs.display().to_string());

    Ok(())
}
