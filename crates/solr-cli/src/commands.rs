use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use solr_sdk::{
    ActivityFeed, ActivityStatus, BatchFailure, BatchOutcome, ClientConfig, Determined,
    ReceiptClient, ReceiptDraft, ReceiptRecord, ResolvedTransaction, UploadSource, Verification,
};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let client = ReceiptClient::from_config(&config).context("failed to build client")?;
    let format = cli.format;
    match cli.command {
        Command::Resolve(args) => cmd_resolve(&client, args, format).await,
        Command::Hash(args) => cmd_hash(&client, args, format).await,
        Command::Create(args) => cmd_create(&client, args, format).await,
        Command::Show(args) => cmd_show(&client, args, format).await,
        Command::List(args) => cmd_list(&client, args, format).await,
        Command::Activity(args) => cmd_activity(client, args, format).await,
        Command::Verify(args) => cmd_verify(&client, args, format).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    config.apply_env();
    if let Some(name) = &cli.network {
        config.network.name = name.clone();
        config.network.rpc_url = None;
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_failures(failed: &[BatchFailure]) {
    for f in failed {
        eprintln!("  {} {}: {}", "skipped".yellow(), f.label, f.reason.dimmed());
    }
}

fn determined<T: std::fmt::Display>(value: &Determined<T>) -> String {
    match value {
        Determined::Known(v) => v.to_string(),
        Determined::Unknown => "unknown".dimmed().to_string(),
    }
}

fn print_transaction(tx: &ResolvedTransaction) {
    let status = match tx.status {
        solr_sdk::TxStatus::Success => tx.status.to_string().green(),
        solr_sdk::TxStatus::Failed => tx.status.to_string().red(),
        solr_sdk::TxStatus::Pending => tx.status.to_string().yellow(),
    };
    println!("{} {}", "Transaction".bold(), tx.id.to_string().yellow());
    println!("  Status:      {status}");
    println!("  Kind:        {}", tx.kind);
    println!("  Payer:       {}", tx.fact.payer);
    println!("  Destination: {}", determined(&tx.fact.destination));
    let amount = match &tx.fact.amount {
        Determined::Known(a) => a.to_sol_string(),
        Determined::Unknown => "unknown".dimmed().to_string(),
    };
    println!("  Amount:      {amount}");
    println!("  Time:        {}", determined(&tx.fact.occurred_at));
    println!("  Slot:        {}", tx.slot);
}

fn print_record(record: &ReceiptRecord) {
    println!("{} {}", "Receipt".bold(), record.address.to_string().yellow());
    println!("  Title:       {}", record.title);
    if !record.description.is_empty() {
        println!("  Description: {}", record.description);
    }
    println!("  Payment:     {}", record.tx_hash);
    println!("  Payer:       {}", record.payer);
    println!("  Creator:     {}", record.creator);
    println!("  Created:     {}", record.timestamp);
    for file in &record.files {
        println!("  File:        {} {}", file.name, file.content_hash.to_string().dimmed());
    }
}

fn print_records(outcome: &BatchOutcome<ReceiptRecord>) {
    if outcome.succeeded.is_empty() {
        println!("No receipts.");
    }
    for record in &outcome.succeeded {
        println!(
            "{}  {}  {}",
            record.address.to_string().yellow(),
            record.timestamp.to_string().dimmed(),
            record.title
        );
    }
    print_failures(&outcome.failed);
}

async fn cmd_resolve(
    client: &ReceiptClient,
    args: ResolveArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let outcome = client.resolve_batch(args.signatures).await;
    if format == OutputFormat::Json {
        return print_json(&outcome);
    }
    for tx in &outcome.succeeded {
        print_transaction(tx);
    }
    print_failures(&outcome.failed);
    if outcome.succeeded.is_empty() {
        bail!("no transaction could be resolved on {}", client.network());
    }
    Ok(())
}

async fn cmd_hash(client: &ReceiptClient, args: HashArgs, format: OutputFormat) -> anyhow::Result<()> {
    let sources = args.files.into_iter().map(UploadSource::path).collect();
    let outcome = client.hash_all(sources).await;
    if format == OutputFormat::Json {
        return print_json(&outcome);
    }
    for proof in &outcome.succeeded {
        println!("{}  {}", proof.content_hash, proof.name);
    }
    print_failures(&outcome.failed);
    Ok(())
}

async fn cmd_create(
    client: &ReceiptClient,
    args: CreateArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let payment = client.resolve(&args.signature).await?;
    let sources = args.files.into_iter().map(UploadSource::path).collect();
    let proofs = client.hash_all(sources).await;
    if !proofs.is_complete() {
        print_failures(&proofs.failed);
        bail!("{} of {} files could not be read", proofs.failed.len(), proofs.requested());
    }

    let draft = ReceiptDraft::new(args.title)
        .description(args.description)
        .files(proofs.into_succeeded());
    let address = client.submit(Some(&payment), &draft).await?;

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "receipt": address,
            "transaction": payment.id,
            "network": client.network().name,
        }));
    }
    println!("{} Receipt created", "✓".green().bold());
    println!("  Address: {}", address.to_string().yellow());
    println!("  Payment: {}", payment.id);
    println!("  Network: {}", client.network().name);
    Ok(())
}

async fn cmd_show(client: &ReceiptClient, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let record = client.fetch(&args.address).await?;
    if format == OutputFormat::Json {
        return print_json(&record);
    }
    print_record(&record);
    Ok(())
}

async fn cmd_list(client: &ReceiptClient, args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let outcome = match &args.creator {
        Some(creator) => client.list_by_creator(creator).await?,
        None => client.list_mine().await?,
    };
    if format == OutputFormat::Json {
        return print_json(&outcome);
    }
    print_records(&outcome);
    Ok(())
}

async fn cmd_activity(
    client: ReceiptClient,
    args: ActivityArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let client = match args.limit {
        Some(limit) => client.with_activity_limit(limit),
        None => client,
    };
    let feed = client.activity(args.address.as_ref()).await?;
    if format == OutputFormat::Json {
        return print_json(&feed);
    }
    print_feed(&feed);
    Ok(())
}

fn print_feed(feed: &ActivityFeed) {
    if feed.entries.is_empty() {
        println!("No recent activity.");
    }
    for entry in &feed.entries {
        let tx = &entry.transaction;
        let state = match &entry.status {
            ActivityStatus::Receipted(address) => format!("receipt {}", address.short()).green(),
            ActivityStatus::ReceiptCreation => "receipt creation".cyan(),
            ActivityStatus::Receiptable => "no receipt".yellow(),
        };
        let amount = tx
            .fact
            .amount
            .known()
            .map(|a| a.to_sol_string())
            .unwrap_or_default();
        println!("{}  {:<18} {:>12}  {}", tx.id.short(), tx.kind.to_string(), amount, state);
    }
    print_failures(&feed.unresolved);
    print_failures(&feed.undecodable_receipts);
    for reference in &feed.duplicate_references {
        eprintln!("  {} several receipts reference {}", "warning:".yellow(), reference);
    }
}

async fn cmd_verify(client: &ReceiptClient, args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let result = client
        .verify(&args.address, UploadSource::path(&args.file))
        .await?;
    if format == OutputFormat::Json {
        print_json(&result)?;
    } else {
        match &result {
            Verification::Verified(proof) => {
                println!("{} {} matches the receipt", "✓".green().bold(), proof.name.bold());
            }
            Verification::Mismatch { expected, actual } => {
                println!("{} {} does not match the receipt", "✗".red().bold(), expected.name.bold());
                println!("  Recorded: {}", expected.content_hash);
                println!("  Actual:   {}", actual);
            }
            Verification::NotInRecord { name, actual } => {
                println!("{} receipt records no file named {}", "✗".red().bold(), name.bold());
                println!("  Actual:   {}", actual);
            }
        }
    }
    if !result.is_verified() {
        bail!("verification failed");
    }
    Ok(())
}
