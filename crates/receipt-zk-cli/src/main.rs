//! receipt-zk CLI: zero-knowledge circuits over Ethereum transaction receipts.
//!
//! Provides six commands covering the circuit lifecycle:
//! `init`, `check`, `compile`, `prove`, `verify`, and `serve`.
//!
//! Circuits are the demo apps in [`apps`]; proving goes through the
//! [`receipt_zk_core::backend::ProvingBackend`] trait, implemented here by the
//! native development backend.

mod apps;
mod commands;
mod output;
mod session;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::apps::DemoApp;
use crate::session::Overrides;

#[derive(Parser)]
#[command(
    name = "receipt-zk",
    about = "Prove facts about Ethereum transaction receipts with zero-knowledge circuits",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to receipt-zk.config.json (default: ./receipt-zk.config.json)
    #[arg(long, global = true, default_value = "receipt-zk.config.json")]
    config: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// RPC endpoint handed to the receipt source
    #[arg(long, env = "RPC_URL", global = true)]
    rpc_url: Option<String>,

    /// Chain the receipts are read from
    #[arg(long, global = true)]
    chain_id: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a workspace with a session config and a sample fixture
    Init {
        /// Directory to initialize
        dir: PathBuf,

        /// Demo app whose sample fixture to write
        #[arg(long, value_enum)]
        app: Option<AppChoice>,
    },

    /// Solve the circuit natively over one transaction
    Check {
        #[arg(long, value_enum)]
        app: AppChoice,

        /// Receipt fixture JSON file
        #[arg(long)]
        fixture: PathBuf,

        /// Transaction hash (0x-prefixed)
        #[arg(long)]
        tx: String,
    },

    /// Compile the circuit and write proving/verification keys
    Compile {
        #[arg(long, value_enum)]
        app: AppChoice,
    },

    /// Generate a proof over one transaction
    Prove {
        #[arg(long, value_enum)]
        app: AppChoice,

        /// Receipt fixture JSON file
        #[arg(long)]
        fixture: PathBuf,

        /// Transaction hash (0x-prefixed)
        #[arg(long)]
        tx: String,

        /// Output path for the proof file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Verify a proof file
    Verify {
        #[arg(long, value_enum)]
        app: AppChoice,

        /// Path to proof file
        #[arg(long)]
        proof: PathBuf,
    },

    /// Serve proofs over HTTP (POST /prove)
    Serve {
        #[arg(long, value_enum, default_value = "uniswap-prime")]
        app: AppChoice,

        /// Receipt fixture JSON file
        #[arg(long)]
        fixture: PathBuf,

        /// Port to listen on
        #[arg(long, default_value = "3001")]
        port: u16,

        /// Origin allowed to call the server from a browser (default: any)
        #[arg(long)]
        cors_origin: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppChoice {
    UniswapPrime,
    TradingVolume,
}

impl AppChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UniswapPrime => "uniswap-prime",
            Self::TradingVolume => "trading-volume",
        }
    }

    pub fn app(&self) -> Box<dyn DemoApp> {
        match self {
            Self::UniswapPrime => Box::new(apps::uniswap_prime::UniswapPrime),
            Self::TradingVolume => Box::new(apps::trading_volume::TradingVolume),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let overrides = Overrides {
        rpc_url: cli.rpc_url,
        chain_id: cli.chain_id,
    };

    match cli.command {
        Commands::Init { dir, app } => {
            commands::init::run(&dir, app).await?;
        }
        Commands::Check { app, fixture, tx } => {
            commands::check::run(&cli.config, &overrides, app, &fixture, &tx).await?;
        }
        Commands::Compile { app } => {
            commands::compile::run(&cli.config, &overrides, app).await?;
        }
        Commands::Prove {
            app,
            fixture,
            tx,
            output,
        } => {
            commands::prove::run(
                &cli.config,
                &overrides,
                app,
                &fixture,
                &tx,
                output.as_deref(),
            )
            .await?;
        }
        Commands::Verify { app, proof } => {
            commands::verify::run(&cli.config, &overrides, app, &proof).await?;
        }
        Commands::Serve {
            app,
            fixture,
            port,
            cors_origin,
        } => {
            commands::serve::run(
                &cli.config,
                &overrides,
                app,
                &fixture,
                port,
                cors_origin.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}
