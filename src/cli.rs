use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidchat")]
#[command(about = "Chat with a YouTube video through its transcript")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a config file (defaults to <config dir>/vidchat/config.toml)
    #[arg(short, long, global = true, env = "VIDCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the transcript picked for a video
    Transcript {
        /// YouTube video URL or video ID
        url: String,
    },

    /// Generate the markdown outline for a video
    Outline {
        /// YouTube video URL or video ID
        url: String,
    },

    /// Line-based chat: outline first, then follow-up questions
    Chat {
        /// YouTube video URL or video ID (asked for interactively when omitted)
        url: Option<String>,
    },

    /// Open TUI interface
    Tui,
}
