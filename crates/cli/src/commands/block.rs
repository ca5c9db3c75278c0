//! Block browsing command.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use stakechain_core::{format_amount, Block, Hash};
use stakechain_storage::{ChainStore, Storage};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct BlockArgs {
    #[command(subcommand)]
    command: BlockCommand,
}

#[derive(Subcommand)]
enum BlockCommand {
    /// List recent blocks
    List {
        /// Directory holding persisted blocks
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: u64,
    },
    /// Show detailed block information
    Info {
        /// Directory holding persisted blocks
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Block index or hash (hex format)
        block_id: String,
    },
}

pub fn run(args: BlockArgs) -> Result<()> {
    match args.command {
        BlockCommand::List { data_dir, count } => list_blocks(&data_dir, count),
        BlockCommand::Info { data_dir, block_id } => show_block_info(&data_dir, &block_id),
    }
}

fn open_chain(data_dir: &Path) -> Result<ChainStore> {
    if !data_dir.exists() {
        bail!(
            "No chain data at {}. Run 'stakechain simulate --data-dir {}' first.",
            data_dir.display(),
            data_dir.display()
        );
    }
    let storage = Storage::open(data_dir)
        .with_context(|| format!("Failed to open storage at {}", data_dir.display()))?;
    let chain = ChainStore::new(storage);
    if !chain.is_initialized()? {
        bail!("Storage at {} holds no chain", data_dir.display());
    }
    Ok(chain)
}

fn list_blocks(data_dir: &Path, count: u64) -> Result<()> {
    let chain = open_chain(data_dir)?;

    println!();
    println!("{}", "Recent Blocks:".bold().cyan());
    println!();

    for block in chain.get_recent_blocks(count)? {
        println!(
            "  {} {} {} {}",
            format!("#{}", block.index()).bright_black(),
            block.hash.to_hex()[..16].bright_yellow(),
            block.header.validator.to_string().bright_cyan(),
            format!("({} txs)", block.transaction_count()).bright_black()
        );
    }

    println!();
    Ok(())
}

fn find_block(chain: &ChainStore, block_id: &str) -> Result<Block> {
    let block = if let Ok(index) = block_id.parse::<u64>() {
        chain.get_block_by_index(index)?
    } else {
        let hash = Hash::from_hex(block_id)
            .with_context(|| format!("Invalid block hash: {}", block_id))?;
        chain.get_block_by_hash(&hash)?
    };
    block.with_context(|| format!("Block not found: {}", block_id))
}

fn show_block_info(data_dir: &Path, block_id: &str) -> Result<()> {
    let chain = open_chain(data_dir)?;
    let block = find_block(&chain, block_id)?;
    let header = &block.header;

    println!();
    println!("{}", "Block Information:".bold().cyan());
    println!();
    println!("  Index:         {}", header.index.to_string().bright_cyan());
    println!("  Hash:          {}", block.hash.to_hex().bright_yellow());
    println!("  Previous Hash: {}", header.previous_hash.to_hex().bright_black());
    println!("  Merkle Root:   {}", header.merkle_root.to_hex().bright_black());
    println!("  State Root:    {}", header.state_root.to_hex().bright_black());
    println!("  Validator:     {}", header.validator.to_string().bright_cyan());
    println!("  Timestamp:     {}", header.timestamp.to_string().bright_black());
    println!("  Nonce:         {}", header.nonce);
    println!("  Fees:          {}", format_amount(block.total_fees()));
    println!(
        "  Transactions:  {}",
        block.transaction_count().to_string().bright_cyan()
    );
    println!();

    if !block.transactions.is_empty() {
        println!("{}", "Transactions:".bold());
        println!();
        for (i, tx) in block.transactions.iter().enumerate() {
            println!(
                "  {} {} {:<8} {} {} (fee {})",
                format!("{}.", i + 1).bright_black(),
                tx.id.to_hex()[..16].bright_yellow(),
                tx.kind.label(),
                tx.from.to_hex()[..16].bright_black(),
                format_amount(tx.amount),
                format_amount(tx.fee)
            );
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakechain_core::ValidatorId;

    fn store_with_blocks(dir: &Path, count: u64) -> ChainStore {
        let chain = ChainStore::new(Storage::open(dir).unwrap());
        let mut tip = Block::genesis(ValidatorId::new("validator-1"), Hash::ZERO, 1_000);
        chain.init_genesis(&tip).unwrap();
        for i in 1..count {
            let block = Block::with_timestamp(
                i,
                tip.hash,
                vec![],
                Hash::ZERO,
                ValidatorId::new("validator-2"),
                1_000 + i,
            );
            chain.append_block(&block).unwrap();
            tip = block;
        }
        chain
    }

    #[test]
    fn test_find_block_by_index_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let chain = store_with_blocks(dir.path(), 3);

        let by_index = find_block(&chain, "2").unwrap();
        assert_eq!(by_index.index(), 2);

        let by_hash = find_block(&chain, &by_index.hash.to_hex()).unwrap();
        assert_eq!(by_hash, by_index);

        assert!(find_block(&chain, "7").is_err());
        assert!(find_block(&chain, "zz").is_err());
    }

    #[test]
    fn test_open_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_chain(&dir.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("No chain data"));
    }
}
