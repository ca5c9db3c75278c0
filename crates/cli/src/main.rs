//! stakechain CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "stakechain")]
#[command(about = "A delegated proof-of-stake ledger", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. "info", "stakechain_chain=debug")
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("stakechain - A delegated proof-of-stake ledger");
            println!("Run 'stakechain --help' for usage information.");
        }
    }
}
