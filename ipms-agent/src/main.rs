//! IPMS sync agent
//!
//! Drives the sync engine from the command line against a local store kept in
//! a JSON file, standing in for the browser's local storage:
//! 1. Sign in and pull every list into the store
//! 2. Write lists as the host would and let the engine push them
//!
//! Usage:
//!   ipms-agent --base-url http://localhost:8089 login admin secret
//!   ipms-agent put paperList papers.json
//!
//! The state file is loaded before each command and saved after it.

use std::{fs, path::PathBuf, sync::Arc};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ipms_sync::{LocalStore, ResumeOutcome, SyncConfig, SyncEngine};
use serde_json::Value;
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "ipms-agent")]
#[command(about = "IPMS sync agent")]
struct Args {
    /// Server base URL
    #[arg(short, long, env = "IPMS_BASE_URL")]
    base_url: Option<String>,

    /// Path to the local store snapshot
    #[arg(short, long, default_value = "ipms-state.json")]
    state: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and pull every list
    Login { username: String, password: String },
    /// Sign out and purge local data
    Logout,
    /// Validate the stored session, pulling if it is live
    Check,
    /// Pull every list
    Pull,
    /// Change the password (ends the session)
    Passwd { old: String, new: String },
    /// Write a JSON file under a key as the host would, then wait for the push
    Put { key: String, file: PathBuf },
    /// Print the store, or one key
    Show { key: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = match &args.base_url {
        Some(url) => SyncConfig::with_base_url(url),
        None => SyncConfig::default(),
    };
    debug!("Server: {}", config.api_base_url);

    let store = Arc::new(
        LocalStore::load_snapshot(&args.state)
            .with_context(|| format!("failed to load state from {}", args.state.display()))?,
    );
    let engine = SyncEngine::connect(config, Arc::clone(&store))
        .context("failed to create sync engine")?;

    run(&engine, args.command).await?;

    store
        .save_snapshot(&args.state)
        .with_context(|| format!("failed to save state to {}", args.state.display()))?;
    Ok(())
}

async fn run(engine: &SyncEngine, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let session = engine
                .login(&username, &password)
                .await
                .context("login failed")?;
            info!("Signed in as {}", session.identity().unwrap_or(&username));
        }
        Command::Logout => {
            engine.logout().await;
            info!("Signed out");
        }
        Command::Check => match engine.resume().await {
            ResumeOutcome::SignedOut => info!("Not signed in"),
            ResumeOutcome::Expired => info!("Session expired, signed out"),
            ResumeOutcome::Offline => info!("Server unreachable, session kept"),
            ResumeOutcome::Pulled(report) => {
                info!("Session live, pulled {:?}", report.written_keys())
            }
        },
        Command::Pull => {
            if !engine.session().is_authenticated() {
                bail!("not signed in");
            }
            let report = engine.pull_all().await;
            for list in &report.lists {
                info!("{}: {} records", list.kind, list.records);
            }
        }
        Command::Passwd { old, new } => {
            engine
                .change_password(&old, &new)
                .await
                .context("password change failed")?;
            info!("Password changed, sign in again");
        }
        Command::Put { key, file } => {
            let contents = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let value: Value = serde_json::from_str(&contents)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;

            let handle = engine.start().context("failed to start sync engine")?;
            engine.store().write(&key, &value.to_string());
            handle.wait_idle().await;
            handle.shutdown();
            info!("Wrote {}", key);
        }
        Command::Show { key: Some(key) } => match engine.store().read(&key) {
            Some(raw) => println!("{}", pretty(&raw)),
            None => bail!("no value under {key}"),
        },
        Command::Show { key: None } => {
            for key in engine.store().keys() {
                let size = engine.store().read(&key).map_or(0, |v| v.len());
                println!("{key}\t{size} bytes");
            }
        }
    }
    Ok(())
}

fn pretty(raw: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| raw.to_string())
}
