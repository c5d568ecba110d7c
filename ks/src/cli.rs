//! CLI argument parsing for khirstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ks")]
#[command(author, version, about = "Inspect the KhirMinTaki record store", long_about = None)]
pub struct Cli {
    /// Store directory (default: local data dir)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List collections present in the store
    Collections,

    /// List record ids in a collection
    List {
        /// Collection name (e.g. sessions, transcripts)
        #[arg(required = true)]
        collection: String,
    },

    /// Print a record as JSON
    Get {
        /// Collection name
        #[arg(required = true)]
        collection: String,

        /// Record id
        #[arg(required = true)]
        id: String,
    },
}

/// Default store directory shared with the `kt` binary
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("khirmintaki")
        .join("store")
}
