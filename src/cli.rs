use crate::sync::Choice;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about)]
pub struct Arguments {
    #[arg(short = 'v', long = None, env = "TAROT_VERBOSITY", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[arg(long, env = "TAROT_HISTORY", default_value = "stopwatch-history.json", global = true)]
    pub history: PathBuf,

    #[command(flatten)]
    pub account: Account,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Args)]
pub struct Account {
    #[arg(long, env = "TAROT_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    #[arg(long, env = "TAROT_CLIENT_SECRET", hide_env_values = true, global = true)]
    pub client_secret: Option<String>,

    #[arg(long, env = "TAROT_TOKEN_CACHE", default_value = "token.json", global = true)]
    pub token_cache: PathBuf,

    #[arg(long, env = "TAROT_REDIRECT_PORT", default_value_t = 2474, global = true)]
    pub redirect_port: u16,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the stopwatch interactively.
    Run {
        /// Milliseconds between display updates.
        #[arg(long, env = "TAROT_TICK_MS", default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
        tick: u64,
    },
    /// List recorded sessions.
    History {
        #[arg(short, long)]
        laps: bool,
    },
    Rename {
        id: u64,
        name: String,
    },
    RenameLap {
        id: u64,
        lap_id: u64,
        name: String,
    },
    Delete {
        id: u64,
    },
    /// Sign in to Google Drive.
    Login,
    Logout,
    /// Back up the history to Google Drive.
    Upload,
    /// Replace the history with the copy on Google Drive.
    Download {
        /// Which copy to keep when two are found.
        #[arg(long)]
        keep: Option<Choice>,
    },
}
