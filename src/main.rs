//! HyperliquidLedger - Main Entry Point
//!
//! Offline front door to the position ledger: ingest fill dumps
//! (JSON lines, as captured from the userFills channel) and inspect
//! the resulting positions and fill history.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hyperliquid_ledger::common::types::{Fill, FillFilter, Network};
use hyperliquid_ledger::config::load_config;
use hyperliquid_ledger::hyperliquid::messages::extract_fills;
use hyperliquid_ledger::ledger::Ledger;

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Network to operate on (mainnet or testnet); defaults to the
    /// configured network
    #[arg(long)]
    network: Option<Network>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest fills from a JSON-lines file (or stdin) into the ledger
    Ingest {
        /// File to read; stdin when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print all open positions on the network
    Positions,
    /// Print recorded fills, newest first
    Fills {
        /// Only fills at or after this timestamp (ms epoch)
        #[arg(long)]
        since: Option<i64>,
        /// Only fills at or before this timestamp (ms epoch)
        #[arg(long)]
        until: Option<i64>,
        /// Maximum number of fills to print
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = load_config(Some(&args.config))?;
    let network = args.network.unwrap_or(config.settings.default_network);

    info!("Opening ledger at {}", config.database.url);
    let ledger = Ledger::connect_with(&config.database).await?;

    match args.command {
        Command::Ingest { file } => ingest(&ledger, network, file).await?,
        Command::Positions => {
            let positions = ledger.list_open_positions(network).await?;
            if positions.is_empty() {
                info!("No open positions on {network}");
            }
            for position in positions {
                println!("{}", serde_json::to_string(&position)?);
            }
        }
        Command::Fills {
            since,
            until,
            limit,
        } => {
            let filter = FillFilter {
                since,
                until,
                limit: Some(limit),
            };
            for fill in ledger.list_fills(network, &filter).await? {
                println!("{}", serde_json::to_string(&fill)?);
            }
        }
    }

    Ok(())
}

/// Feed JSON-lines fill data through the ledger
///
/// Each line may be a full channel envelope, a `userFills` payload, a bare
/// fill object, or a list of fills. Malformed lines are logged and skipped;
/// they never abort the rest of the batch.
async fn ingest(ledger: &Ledger, network: Network, file: Option<PathBuf>) -> Result<()> {
    let reader: Box<dyn BufRead> = match file {
        Some(path) => Box::new(std::io::BufReader::new(std::fs::File::open(&path)?)),
        None => Box::new(std::io::stdin().lock()),
    };

    let mut applied = 0u64;
    let mut duplicates = 0u64;
    let mut rejected = 0u64;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping malformed line: {e}");
                rejected += 1;
                continue;
            }
        };

        let ws_fills = match extract_fills(&value) {
            Ok(fills) => fills,
            Err(e) => {
                warn!("Skipping line without fills: {e}");
                rejected += 1;
                continue;
            }
        };

        for ws_fill in ws_fills {
            let tid = ws_fill.tid;
            let fill = match Fill::try_from(ws_fill) {
                Ok(fill) => fill,
                Err(e) => {
                    warn!(trade_id = tid, "Rejected fill: {e}");
                    rejected += 1;
                    continue;
                }
            };

            let outcome = ledger.record_fill(&fill, network).await?;
            if outcome.applied {
                applied += 1;
            } else {
                duplicates += 1;
            }
        }
    }

    info!(applied, duplicates, rejected, "Ingest complete");
    Ok(())
}
