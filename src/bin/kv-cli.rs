//! Command-line access to the router's key-value store.
//!
//! Reads and edits the same SQLite file the handlers use, so counters and
//! saved values can be inspected or reset from a shell.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use intercept_router::config::{load_config, StoreConfig};
use intercept_router::KvStore;

#[derive(Parser)]
#[command(name = "kv-cli")]
#[command(about = "Inspect and edit the intercept-router key-value store", long_about = None)]
struct Cli {
    /// Store file. Defaults to the path in `--config`, then to the built-in default.
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Router config file to read the store path from.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under a key
    Get { key: String },
    /// Store a JSON value (bare words are stored as strings)
    Set { key: String, value: String },
    /// Delete a key
    Rm { key: String },
    /// Atomically add to an integer value
    Incr {
        key: String,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        by: i64,
    },
    /// List every entry
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut store_config = match &cli.config {
        Some(path) => load_config(path)?.store,
        None => StoreConfig::default(),
    };
    if let Some(path) = cli.store {
        store_config.path = path;
    }
    let store = KvStore::open(&store_config.path, Duration::from_millis(store_config.busy_timeout_ms));

    match cli.command {
        Commands::Get { key } => {
            let value: Option<Value> = store.get(&key).await?;
            print_json(&value.unwrap_or(Value::Null))?;
        }
        Commands::Set { key, value } => {
            let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            store.set(&key, &value).await?;
            print_json(&value)?;
        }
        Commands::Rm { key } => {
            store.remove(&key).await?;
        }
        Commands::Incr { key, by } => {
            let next = store.increment(&key, by).await?;
            println!("{}", next);
        }
        Commands::List => {
            let entries: serde_json::Map<String, Value> = store.entries().await?.into_iter().collect();
            print_json(&Value::Object(entries))?;
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
