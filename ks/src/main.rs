use chrono::{TimeZone, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use khirstore::Store;
use khirstore::cli::{Cli, Command, default_store_path};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
    Ok(())
}

fn format_ms(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let store_path = cli.store.unwrap_or_else(default_store_path);
    info!("ks opening {}", store_path.display());
    let store = Store::open(&store_path)?;

    match cli.command {
        Command::Collections => {
            let names = store.collections()?;
            if names.is_empty() {
                println!("No records found");
            }
            for name in names {
                println!("{}", name);
            }
        }
        Command::List { collection } => {
            let summaries = store.summaries(&collection)?;
            if summaries.is_empty() {
                println!("No records in {}", collection);
            }
            for s in summaries {
                println!("{} {}", s.id.cyan(), format_ms(s.updated_at).dimmed());
            }
        }
        Command::Get { collection, id } => match store.get_raw(&collection, &id)? {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => {
                eprintln!("{} {}/{} not found", "✗".red(), collection, id);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
