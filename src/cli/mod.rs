pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "storyfeed")]
#[command(about = "Share and browse stories from the terminal", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/storyfeed/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the local database
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the session and cached stories
    Logout,
    /// Show whether a session is stored
    Status,
    /// Page through the story feed
    Stories {
        /// Stop after this many pages
        #[arg(short, long)]
        pages: Option<usize>,
    },
    /// Browse the story feed page by page, forward and back
    Browse,
    /// List stories that carry coordinates
    Map,
    /// Post a new story
    Upload {
        /// Photo to upload
        path: PathBuf,
        #[arg(short, long)]
        description: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
    },
}
