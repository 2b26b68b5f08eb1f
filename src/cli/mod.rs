pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Collect and deduplicate proxy configs posted in chat channels", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/sluice/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan channels and write the output document
    Scan {
        /// Telegram export file or directory of exports
        #[arg(short, long)]
        source: PathBuf,

        /// Output file (default: from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the document instead of writing it
        #[arg(long)]
        stdout: bool,

        /// Emergency subscription URL, overriding config and control notice
        #[arg(long)]
        emergency_url: Option<String>,

        /// Announcement line for the custom block (repeatable)
        #[arg(long = "header")]
        headers: Vec<String>,
    },
    /// Print the unique configs found in a text file
    Extract {
        /// Text file to scan
        path: PathBuf,
    },
    /// Fetch and decode a subscription feed
    Feed {
        /// Subscription URL
        url: String,
    },
}
