use std::path::Path;

use anyhow::Result;
use dialoguer::Select;

use receipt_zk_core::config::{SessionConfig, CONFIG_FILE};

use crate::output;
use crate::AppChoice;

/// File name of the sample fixture written by `init`.
pub const FIXTURE_FILE: &str = "fixture.json";

/// Initialize a receipt-zk workspace in `dir`.
///
/// Writes a default session config and a fixture with the sample transaction
/// of the selected app. If no app is specified, prompts interactively.
pub async fn run(dir: &Path, app: Option<AppChoice>) -> Result<()> {
    output::print_header(&format!("receipt-zk init: {}", dir.display()));

    let choice = match app {
        Some(choice) => choice,
        None => {
            let options = [AppChoice::UniswapPrime, AppChoice::TradingVolume];
            let descriptions = &[
                "uniswap-prime: WETH/DEAI transfers and pool swaps in one transaction",
                "trading-volume: USDC sold by one user, summed over swaps",
            ];
            let selection = Select::new()
                .with_prompt("Select demo app")
                .items(descriptions)
                .default(0)
                .interact()?;
            options[selection]
        }
    };

    output::print_step(1, 2, "Writing session config");
    std::fs::create_dir_all(dir)?;
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() {
        output::print_warning(&format!("{} exists, leaving it untouched", config_path.display()));
    } else {
        SessionConfig::default().save(&config_path)?;
    }

    output::print_step(2, 2, "Writing sample fixture");
    let app_impl = choice.app();
    let fixture = app_impl.sample_fixture();
    std::fs::write(dir.join(FIXTURE_FILE), serde_json::to_string_pretty(&fixture)?)?;

    output::print_success(&format!(
        "Workspace '{}' created for {}",
        dir.display(),
        choice.as_str()
    ));
    let tx = app_impl.sample_tx();
    let app_name = choice.as_str();
    println!();
    println!("  Next steps:");
    println!("    cd {}", dir.display());
    println!("    receipt-zk check --app {app_name} --fixture {FIXTURE_FILE} --tx {tx}");
    println!("    receipt-zk compile --app {app_name}");
    println!("    receipt-zk prove --app {app_name} --fixture {FIXTURE_FILE} --tx {tx}");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use receipt_zk_core::source::FixtureSource;

    #[tokio::test]
    async fn test_init_writes_config_and_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        run(&ws, Some(AppChoice::TradingVolume)).await.unwrap();

        let config = SessionConfig::load(&ws.join(CONFIG_FILE)).unwrap();
        assert_eq!(config, SessionConfig::default());
        let source = FixtureSource::load(&ws.join(FIXTURE_FILE)).await.unwrap();
        assert_eq!(source.len(), 1);
    }
}
