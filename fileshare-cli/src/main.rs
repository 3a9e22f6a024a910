//! Fileshare CLI
//!
//! Command-line interface for publishing files to the ledger-backed registry
//! and browsing its catalog.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fileshare_api::{ApiConfig, ApiServer, AppState};
use fileshare_catalog::CatalogQuery;
use fileshare_core::types::{ContentAddress, FileEntry, Identity};
use fileshare_session::{PublishState, Session, SignupOutcome, StateObserver};

/// Fileshare - content-addressed files recorded on a ledger
#[derive(Parser)]
#[command(name = "fileshare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Backend selection. Without an RPC URL everything runs in memory for the
/// lifetime of the command.
#[derive(Args)]
struct BackendArgs {
    /// JSON-RPC node URL
    #[arg(long, global = true, env = "FILESHARE_RPC_URL")]
    rpc_url: Option<String>,

    /// Registry contract address
    #[arg(long, global = true, env = "FILESHARE_CONTRACT_ADDRESS")]
    contract: Option<String>,

    /// IPFS gateway base URL
    #[arg(long, global = true, env = "FILESHARE_GATEWAY_URL")]
    gateway: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the active account
    Signup,

    /// Store a file and record it in the registry
    Publish {
        /// File to publish
        path: PathBuf,
        /// Display name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List catalog entries
    List {
        /// Only entries recorded by the active account
        #[arg(long, conflicts_with = "owner")]
        mine: bool,
        /// Only entries recorded by this identity
        #[arg(long)]
        owner: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Search entry names (case-insensitive)
    Search {
        /// Substring to look for
        query: String,
    },

    /// Download content by address
    Fetch {
        /// Content address
        address: String,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "fileshare=debug,info"
    } else {
        "fileshare=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = api_config(&cli.backend);

    match cli.command {
        Commands::Signup => cmd_signup(config).await,
        Commands::Publish { path, name } => cmd_publish(config, &path, name).await,
        Commands::List { mine, owner, json } => cmd_list(config, mine, owner.as_deref(), json).await,
        Commands::Search { query } => cmd_search(config, &query).await,
        Commands::Fetch { address, output } => cmd_fetch(config, &address, output.as_deref()).await,
        Commands::Serve { port, bind } => cmd_serve(config, port, &bind).await,
    }
}

/// Environment configuration with command-line overrides applied.
fn api_config(args: &BackendArgs) -> ApiConfig {
    let mut config = ApiConfig::from_env();
    if let Some(url) = &args.rpc_url {
        config.rpc_url = Some(url.clone());
    }
    if let Some(contract) = &args.contract {
        config.contract_address = Some(contract.clone());
    }
    if let Some(gateway) = &args.gateway {
        config.gateway_url = gateway.clone();
    }
    config
}

fn open_session(config: ApiConfig, observer: Option<StateObserver>) -> Result<Arc<Session>> {
    if config.is_dev() {
        eprintln!(
            "{}",
            "⚠️  No RPC URL configured, using an in-memory ledger (nothing persists)".yellow()
        );
    }
    let state = AppState::with_observer(config, observer).context("Failed to set up backends")?;
    debug!(backend = state.backend, "Session ready");
    Ok(state.session)
}

/// Register the active account
async fn cmd_signup(config: ApiConfig) -> Result<()> {
    let session = open_session(config, None)?;
    let account = session.connect().await.context("No active account")?;
    println!("{} {}", "👤 Account:".cyan().bold(), account.identity);

    match session.sign_up().await.context("Signup failed")? {
        SignupOutcome::AlreadyRegistered => {
            println!("{}", "ℹ️  Already registered, nothing to do.".yellow());
        }
        SignupOutcome::Registered { transaction } => {
            println!("\n{}", "✅ Registered:".green().bold());
            println!("   {} {}", "Transaction:".yellow(), transaction.tx_hash);
            if let Some(block) = transaction.block_number {
                println!("   {} {}", "Block:".dimmed(), block);
            }
        }
    }

    Ok(())
}

/// Store a file and record it
async fn cmd_publish(config: ApiConfig, path: &Path, name: Option<String>) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = match name {
        Some(name) => name,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Path has no file name, pass --name")?,
    };

    println!("{} {} ({} bytes)", "📤 Publishing".cyan().bold(), name, bytes.len());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("   {spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    let spinner = pb.clone();
    let observer: StateObserver = Arc::new(move |state: &PublishState| match state {
        PublishState::Recording { address } => spinner.set_message(format!("recording {}", address)),
        other => spinner.set_message(other.label()),
    });

    let session = open_session(config, Some(observer))?;
    let result = session.publish(&name, &bytes).await;
    pb.finish_and_clear();
    let receipt = result.context("Publish failed")?;

    println!("\n{}", "✅ Published:".green().bold());
    println!("   {} {}", "Name:".yellow(), receipt.name);
    println!("   {} {}", "Address:".yellow(), receipt.address);
    if let Some(url) = session.locator(&receipt.address) {
        println!("   {} {}", "URL:".yellow(), url);
    }
    println!("   {} {}", "Transaction:".dimmed(), receipt.transaction.tx_hash);
    match (&receipt.entry, &receipt.refresh_error) {
        (Some(entry), _) => println!("   {} #{}", "Index:".dimmed(), entry.index),
        (None, Some(err)) => println!("   {} {}", "⚠️  Catalog not refreshed:".yellow(), err),
        (None, None) => {}
    }

    Ok(())
}

/// List catalog entries
async fn cmd_list(config: ApiConfig, mine: bool, owner: Option<&str>, json: bool) -> Result<()> {
    let session = open_session(config, None)?;

    let outcome = if mine {
        session.my_files().await.context("No active account")?
    } else if let Some(owner) = owner {
        let owner = Identity::new(owner).context("Invalid owner")?;
        session.query(&CatalogQuery::new().with_owner(owner)).await
    } else {
        session.all_files().await
    };

    if let Some(err) = &outcome.error {
        eprintln!("{} {}", "⚠️  Ledger unreachable, showing last snapshot:".yellow(), err);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(outcome.catalog.entries())?);
        return Ok(());
    }

    print_entries(&session, outcome.catalog.entries().iter());
    Ok(())
}

/// Search entry names
async fn cmd_search(config: ApiConfig, query: &str) -> Result<()> {
    let session = open_session(config, None)?;
    let outcome = session.search(query).await;
    if let Some(err) = &outcome.error {
        eprintln!("{} {}", "⚠️  Ledger unreachable, showing last snapshot:".yellow(), err);
    }

    println!("{} \"{}\"", "🔎 Results for".cyan().bold(), query);
    print_entries(&session, outcome.catalog.entries().iter());
    Ok(())
}

/// Download content
async fn cmd_fetch(config: ApiConfig, address: &str, output: Option<&Path>) -> Result<()> {
    let address = ContentAddress::parse(address).context("Invalid content address")?;
    let session = open_session(config, None)?;
    let bytes = session.fetch(&address).await.context("Fetch failed")?;

    match output {
        Some(path) => {
            std::fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {} bytes to {}", "✅ Wrote".green(), bytes.len(), path.display());
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&bytes)?;
        }
    }

    Ok(())
}

/// Run API server
async fn cmd_serve(config: ApiConfig, port: u16, bind: &str) -> Result<()> {
    println!("{}", "🚀 Starting Fileshare API server...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::new(config).context("Failed to set up backends")?;

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    server.run(addr).await?;

    Ok(())
}

fn print_entries<'a>(session: &Session, entries: impl Iterator<Item = &'a FileEntry>) {
    let mut count = 0;
    for entry in entries {
        count += 1;
        println!("   {} {}", format!("#{}", entry.index).dimmed(), entry.name.bold());
        println!("      {} {}", "Owner:".dimmed(), entry.owner);
        match session.locator(&entry.address) {
            Some(url) => println!("      {} {}", "URL:".dimmed(), url),
            None => println!("      {} {}", "Address:".dimmed(), entry.address),
        }
    }
    if count == 0 {
        println!("{}", "No files found.".yellow());
    } else {
        println!("\n{} {} file(s)", "📋".green(), count);
    }
}
