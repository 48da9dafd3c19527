use std::path::Path;

use anyhow::Result;

use receipt_zk_core::source::FixtureSource;

use crate::output;
use crate::session::{self, Overrides, Session};
use crate::AppChoice;

/// Solve the app circuit natively over one transaction.
///
/// Queries the fixture, builds the circuit input and evaluates every
/// pipeline stage without compiling or proving. Fails on the first violated
/// assertion.
pub async fn run(
    config_path: &Path,
    overrides: &Overrides,
    app: AppChoice,
    fixture: &Path,
    tx: &str,
) -> Result<()> {
    output::print_header("receipt-zk check");

    let config = session::load_config(config_path, overrides)?;
    let tx_hash = session::parse_tx_hash(tx)?;
    let session = Session::new(config, app)?;

    output::print_key_value("App", app.as_str());
    output::print_key_value("Transaction", &tx_hash.to_string());

    output::print_step(1, 2, "Building circuit input...");
    let source = FixtureSource::load(fixture).await?;
    let input = session.build_input(source, tx_hash).await?;
    output::print_key_value("Receipts", &input.receipts.len().to_string());
    output::print_key_value("Input commitment", &input.input_commitment.to_string());

    output::print_step(2, 2, "Solving circuit...");
    let eval = session
        .descriptor
        .check(&input.stream()?, &session.app.assignment())?;

    for (i, slots) in eval.filtered.iter().enumerate() {
        output::print_key_value(&format!("Filter {}", i + 1), &format!("{slots:?}"));
    }
    for (i, word) in eval.outputs.iter().enumerate() {
        output::print_key_value(&format!("Output {i}"), &word.to_string());
    }
    output::print_success("Circuit solved: every assertion holds");

    Ok(())
}
