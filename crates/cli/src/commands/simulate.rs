//! In-process chain simulation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use stakechain_chain::{Blockchain, ManualClock};
use stakechain_core::{format_amount, now_millis, tokens, Address, Keypair, Signer, Transaction, ValidatorId};
use stakechain_storage::{ChainStore, Storage};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of blocks to produce
    #[arg(short, long, default_value = "20")]
    blocks: u64,

    /// Number of funded user accounts
    #[arg(short, long, default_value = "5")]
    accounts: usize,

    /// Starting balance of each account, in whole tokens
    #[arg(long, default_value = "10000")]
    funding: u64,

    /// Seed for account activity
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Simulated time between blocks, in milliseconds
    #[arg(long, default_value = "3600000")]
    block_time_ms: u64,

    /// Persist produced blocks to this directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// JSON chain config (defaults apply to missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

struct User {
    name: String,
    keypair: Keypair,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let clock = ManualClock::new(now_millis());
    let mut chain = Blockchain::with_clock(config, Arc::new(clock.clone()))?;

    if let Some(data_dir) = &args.data_dir {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        let storage = Storage::open(data_dir).context("Failed to open storage")?;
        chain
            .attach_store(ChainStore::new(storage))
            .with_context(|| format!("Cannot persist into {}", data_dir.display()))?;
    }

    let users: Vec<User> = (0..args.accounts)
        .map(|i| {
            let name = format!("account-{}", i);
            let keypair = Keypair::from_label(&name);
            User { name, keypair }
        })
        .collect();
    for user in &users {
        chain.create_account(user.keypair.address(), tokens(args.funding))?;
    }
    let validators: Vec<ValidatorId> = chain.get_active_validators().iter().map(|v| v.id.clone()).collect();

    println!("{}", "Running simulation...".bold().cyan());
    println!();

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut dropped = 0usize;
    for _ in 0..args.blocks {
        if !users.is_empty() {
            for _ in 0..rng.gen_range(0..=users.len()) {
                let user = &users[rng.gen_range(0..users.len())];
                if let Some(tx) = random_transaction(&mut rng, &chain, user, &users, &validators) {
                    if let Err(e) = chain.submit_transaction(tx, &user.keypair.public_key()) {
                        debug!(user = %user.name, error = %e, "submission rejected");
                    }
                }
            }
        }

        clock.advance(args.block_time_ms);
        for user in &users {
            chain.complete_unstaking(user.keypair.address())?;
        }

        let produced = chain.produce_block()?;
        dropped += produced.receipts.iter().filter(|r| !r.success).count();
        let block = &produced.block;
        println!(
            "  {} {} {} {}",
            format!("#{}", block.index()).bright_black(),
            block.hash.to_hex()[..16].bright_yellow(),
            block.header.validator.to_string().bright_cyan(),
            format!("({} txs)", block.transaction_count()).bright_black()
        );
    }

    chain.validate_chain()?;
    chain.check_invariants()?;

    let stats = chain.get_network_stats();
    println!();
    println!("{}", "Network:".bold().cyan());
    println!("  Height:            {}", stats.height);
    println!(
        "  Validators:        {} ({} active)",
        stats.total_validators, stats.active_validators
    );
    println!("  Total staked:      {}", format_u128(stats.total_staked));
    println!("  Total minted:      {}", format_u128(stats.total_minted));
    println!("  Pending txs:       {}", stats.mempool_size);
    println!("  Dropped txs:       {}", dropped);
    println!();

    println!("{}", "Validators:".bold().cyan());
    for v in chain.staking().registry().validators() {
        println!(
            "  {:<14} blocks {:>4}  stake {}",
            v.id.to_string(),
            v.blocks_produced,
            format_amount(v.total_stake)
        );
    }
    println!();

    println!("{}", "Accounts:".bold().cyan());
    for user in &users {
        let info = chain.get_staking_info(&user.keypair.address());
        println!(
            "  {:<12} balance {}  staked {}  pending {}",
            user.name,
            format_amount(info.balance),
            format_amount(info.staked),
            info.pending_unstakes.len()
        );
    }
    println!();

    if let Some(store) = chain.store() {
        store.storage().flush()?;
        println!("{}  Blocks persisted", "✓".green().bold());
    }
    Ok(())
}

/// A transfer, stake or unstake the user can plausibly afford.
fn random_transaction(
    rng: &mut StdRng,
    chain: &Blockchain,
    user: &User,
    users: &[User],
    validators: &[ValidatorId],
) -> Option<Transaction> {
    let from = user.keypair.address();
    let balance = chain.ledger().balance_of(&from);
    let min_delegation = chain.config().staking.min_delegation;

    let tx = match rng.gen_range(0..10) {
        0..=4 if users.len() > 1 => {
            let to: Address = users
                .iter()
                .map(|u| u.keypair.address())
                .filter(|a| *a != from)
                .collect::<Vec<_>>()
                .choose(rng)
                .copied()?;
            let amount = rng.gen_range(1..=(balance / 10).max(1));
            Transaction::transfer(from, to, amount)
        }
        0..=7 => {
            let validator = validators.choose(rng)?.clone();
            let ceiling = (balance / 4).max(min_delegation);
            let amount = rng.gen_range(min_delegation..=ceiling);
            Transaction::stake(from, validator, amount)
        }
        _ => {
            let staking = chain.staking();
            let delegation = staking
                .delegations_of(&from)
                .into_iter()
                .filter(|d| d.staked_amount > 0)
                .collect::<Vec<_>>()
                .choose(rng)
                .copied()?;
            let amount = rng.gen_range(1..=delegation.staked_amount);
            Transaction::unstake(from, delegation.validator.clone(), amount)
        }
    };
    Some(tx.signed(&user.keypair))
}

fn format_u128(amount: u128) -> String {
    match u64::try_from(amount) {
        Ok(small) => format_amount(small),
        Err(_) => amount.to_string(),
    }
}
