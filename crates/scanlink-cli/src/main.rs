//! # scanlink
//!
//! Operator front-end for the scanlink field scanner client.
//!
//! This binary wraps [`scanlink_core::ScanClient`] in subcommands so a
//! scan can be reported (or queued) from a shell, and the client's state
//! inspected, without the capture UI:
//!
//! ```bash
//! scanlink scan mem-042 --team teamA
//! scanlink status
//! scanlink set-url http://orchestrator.local:3000
//! scanlink clear-queue
//! scanlink watch
//! ```
//!
//! Outcomes and status print as JSON on stdout; logs go to stderr.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;
use url::Url;

use scanlink_core::{ClientConfig, FileStore, ScanClient, StateStore};

mod logging;

#[derive(Debug, Parser)]
#[command(name = "scanlink", version, about = "Field scanner client for the orchestrator")]
struct Cli {
    /// Data directory for persisted state (device id, offline queue).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to the client config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Orchestrator base URL, overriding config for this invocation.
    #[arg(long, global = true)]
    url: Option<Url>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report a scan; prints the typed outcome as JSON.
    Scan {
        /// Token that was scanned.
        token_id: String,

        /// Team to attribute the scan to.
        #[arg(long)]
        team: Option<String>,
    },

    /// Print a status snapshot (queue, identity, liveness).
    Status,

    /// Empty the persisted offline queue.
    ClearQueue,

    /// Persist a new orchestrator base URL and probe it.
    SetUrl {
        /// The new base URL.
        url: Url,
    },

    /// Subscribe to connect/disconnect edges and print them until Ctrl-C.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init()?;

    let cli = Cli::parse();
    let client = build_client(&cli).await?;

    let result = run_command(&cli.command, &client).await;
    client.destroy().await;
    result
}

async fn build_client(cli: &Cli) -> anyhow::Result<ScanClient> {
    let store = match &cli.data_dir {
        Some(dir) => FileStore::new(dir.clone()),
        None => FileStore::default_location().context("cannot resolve data directory")?,
    };

    let mut config = match &cli.config {
        Some(path) => ClientConfig::load_or_default(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.base_url = Some(url.clone());
    }
    debug!(?config, "client configuration resolved");

    let store: Arc<dyn StateStore> = Arc::new(store);
    let client = ScanClient::new(config, store)
        .await
        .context("failed to construct scan client")?;
    Ok(client)
}

async fn run_command(command: &Command, client: &ScanClient) -> anyhow::Result<()> {
    match command {
        Command::Scan { token_id, team } => {
            // Wait out the first probe so a one-shot invocation gates on a
            // definite Online/Offline instead of Unknown.
            client.await_first_probe().await;
            let outcome = client.scan(token_id, team.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Status => {
            client.await_first_probe().await;
            let status = client.status().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::ClearQueue => {
            client.clear_queue().await;
            let status = client.status().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::SetUrl { url } => {
            client.update_base_url(url.clone()).await?;
            client.await_first_probe().await;
            let status = client.status().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Watch => {
            let mut events = client.subscribe();
            eprintln!("watching connectivity, Ctrl-C to stop");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    event = events.recv() => match event {
                        Ok(event) => println!("{event:?}"),
                        Err(_) => break,
                    }
                }
            }
        }
    }
    Ok(())
}
