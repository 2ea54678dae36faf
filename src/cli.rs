use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::config::ExecutionMode;

#[derive(Parser)]
#[command(name = "dexflow", about = "Asynchronous DEX order execution service")]
pub struct Cli {
    /// Configuration directory
    #[arg(long, default_value = "config", env = "DEXFLOW_CONFIG_DIR")]
    pub config_dir: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the execution service: worker pool plus live relay
    Run {
        /// Override the configured execution mode (simulated|live)
        #[arg(long)]
        mode: Option<ExecutionMode>,
    },
    /// Persist an order and enqueue it (stand-in for the intake service)
    Enqueue {
        #[arg(long, default_value = "cli")]
        user: String,
        #[arg(long)]
        token_in: String,
        #[arg(long)]
        token_out: String,
        #[arg(long)]
        amount: Decimal,
        /// Omit for a market order
        #[arg(long)]
        limit_price: Option<Decimal>,
        #[arg(long)]
        slippage: Option<Decimal>,
    },
    /// Run database migrations and exit
    Migrate,
}
