//! # peeruno
//!
//! Command-line driver for peeruno tables.
//!
//! ## Commands
//!
//! - `simulate`: Run a host and bot followers over the in-memory transport
//! - `default-config`: Print the default host configuration
//!
//! ## Example
//!
//! ```bash
//! # Four bots, reproducible deal
//! peeruno simulate --players 4 --seed 42
//!
//! # Custom rules, chatty logs
//! peeruno default-config > table.toml
//! RUST_LOG=debug peeruno --config table.toml simulate --players 6
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uno_host::Config;

mod bot;
mod commands;

use commands::{default_config, simulate};

/// Command-line driver for peeruno tables.
#[derive(Parser, Debug)]
#[command(name = "peeruno")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play one game between bots and check every view converges
    Simulate {
        /// Seats at the table, host included
        #[arg(long, short, default_value = "4")]
        players: usize,

        /// Seed for the host's shuffles
        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many moves if nobody has won
        #[arg(long, default_value = "1000")]
        max_turns: usize,
    },

    /// Print the default configuration
    DefaultConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Simulate {
            players,
            seed,
            max_turns,
        } => {
            let options = simulate::Options {
                players,
                seed,
                max_turns,
            };
            let outcome = simulate::run(config, options).await?;

            match &outcome.winner {
                Some(winner) => println!("{winner} wins after {} turns", outcome.turns),
                None => println!("No winner after {} turns", outcome.turns),
            }
            if let Some(action) = &outcome.final_state.last_action {
                println!("  Last action: {action}");
            }
            for player in &outcome.final_state.players {
                println!("  {:<8} {} cards", player.name, player.hand.len());
            }
            println!(
                "  Converged: host and {} followers, {} chat messages",
                outcome.followers,
                outcome.chat.len()
            );
        }
        Commands::DefaultConfig => {
            print!("{}", default_config::run()?);
        }
    }

    Ok(())
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured filter.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
