use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use solr_sdk::{Address, TxId};

#[derive(Parser)]
#[command(
    name = "solr",
    about = "SolReceipts: verifiable receipts for ledger payments",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Network name (devnet, testnet, mainnet-beta, localnet)
    #[arg(short, long, global = true)]
    pub network: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a transaction into payment facts
    Resolve(ResolveArgs),
    /// Hash supporting documents
    Hash(HashArgs),
    /// Create a receipt for a payment
    Create(CreateArgs),
    /// Show the receipt stored at an address
    Show(ShowArgs),
    /// List receipts by creator
    List(ListArgs),
    /// Show recent wallet activity and its receipt state
    Activity(ActivityArgs),
    /// Check a document against a stored receipt
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Transaction signatures
    #[arg(required = true)]
    pub signatures: Vec<TxId>,
}

#[derive(Args)]
pub struct HashArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Signature of the payment being receipted
    pub signature: TxId,
    #[arg(short, long, default_value = "")]
    pub title: String,
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Supporting document, repeatable
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub address: Address,
}

#[derive(Args)]
pub struct ListArgs {
    /// Creator to list; defaults to the configured keypair
    #[arg(long)]
    pub creator: Option<Address>,
}

#[derive(Args)]
pub struct ActivityArgs {
    /// Wallet to inspect; defaults to the configured keypair
    #[arg(long)]
    pub address: Option<Address>,
    /// Number of recent signatures to inspect
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Receipt address
    pub address: Address,
    pub file: PathBuf,
}
