//! Small demo binary exercising the parser/codec over a raw block or
//! transaction file (spec "cli/main" ambient module).

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use btc_protocol_core::config::{init_tracing, Config};
use btc_protocol_core::hash::Hash32;
use btc_protocol_core::parser::{self, ParseMode};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "btc-protocol-cli", about = "Bitcoin-family protocol core CLI")]
struct Args {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a raw block from a file and print its header and transaction summary.
    Block {
        path: PathBuf,
        /// Expected block hash (hex), checked if given.
        #[arg(long)]
        expect_hash: Option<String>,
    },
    /// Parse a single raw transaction from a file and print its txid/wtxid.
    Tx { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(&args.config)?;

    match args.command {
        Command::Block { path, expect_hash } => {
            let data = fs::read(&path)?;
            let expected = expect_hash
                .map(|hex| Hash32::from_display_hex(&hex))
                .transpose()?;
            let block = parser::parse_block(&data, expected, ParseMode::Constructing)?;
            println!("block {}", block.block_hash.to_display_hex());
            println!("  version: {}", block.header.version);
            println!("  prev: {}", block.header.prev_block_hash.to_display_hex());
            println!("  merkle_root: {}", block.header.merkle_root.to_display_hex());
            println!("  transactions: {}", block.transactions.len());
            for (index, tx) in block.transactions.iter().enumerate() {
                println!(
                    "    [{index}] txid={} wtxid={} coinbase={}",
                    tx.txid.to_display_hex(),
                    tx.wtxid.to_display_hex(),
                    tx.is_coinbase
                );
            }
        }
        Command::Tx { path } => {
            let data = fs::read(&path)?;
            let tx = parser::parse_standalone_transaction(&data)?;
            println!("txid: {}", tx.txid().to_display_hex());
            println!("wtxid: {}", tx.wtxid().to_display_hex());
            println!("segwit: {}", tx.is_segwit());
            println!("inputs: {}", tx.inputs.len());
            println!("outputs: {}", tx.outputs.len());
        }
    }

    Ok(())
}
