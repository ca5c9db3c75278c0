//! Genesis inspection command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use stakechain_chain::Blockchain;
use stakechain_core::{format_amount, BPS_DENOMINATOR};
use std::path::PathBuf;

#[derive(Args)]
pub struct GenesisArgs {
    /// JSON chain config (defaults apply to missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the resolved config as JSON instead
    #[arg(long)]
    json: bool,
}

pub fn run(args: GenesisArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let chain = Blockchain::new(config)?;
    let genesis = chain.latest_block();
    let stats = chain.get_network_stats();

    println!();
    println!("{}", "Genesis Block:".bold().cyan());
    println!();
    println!("  Hash:        {}", genesis.hash.to_hex().bright_yellow());
    println!("  State Root:  {}", genesis.header.state_root.to_hex().bright_black());
    println!("  Producer:    {}", genesis.header.validator.to_string().bright_cyan());
    println!();

    println!("{}", "Validators:".bold().cyan());
    println!();
    for v in chain.staking().registry().validators() {
        println!(
            "  {:<14} {:>6}%  stake {}  reward {}",
            v.id.to_string().bright_cyan(),
            format!("{:.2}", v.commission_bps as f64 * 100.0 / BPS_DENOMINATOR as f64),
            format_amount(v.total_stake).bright_yellow(),
            v.reward_address.to_hex().bright_black()
        );
    }
    println!();

    println!("{}", "Parameters:".bold().cyan());
    println!();
    println!("  Min delegation:   {}", format_amount(stats.min_delegation));
    println!("  Max validators:   {}", stats.max_validators);
    println!(
        "  Base reward rate: {:.2}%",
        stats.base_reward_rate_bps as f64 * 100.0 / BPS_DENOMINATOR as f64
    );
    println!("  Block reward:     {}", format_amount(chain.config().staking.block_reward));
    println!(
        "  Unstaking period: {} h",
        stats.unstaking_period_ms / (60 * 60 * 1000)
    );
    println!();

    Ok(())
}
