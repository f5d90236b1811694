use std::path::PathBuf;

use clap::{Parser, Subcommand};
use learna_common::ChatId;

/// Learna: stream conversations with your study assistant.
#[derive(Parser, Debug)]
#[command(name = "learna", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a chat from a first prompt, stream the reply, keep talking.
    New {
        prompt: String,
        /// Model id (defaults to the first configured model).
        #[arg(long)]
        model: Option<String>,
        /// Agent id (defaults to `chat.default_agent`).
        #[arg(long)]
        agent: Option<String>,
        /// Document to upload with the prompt. Repeatable.
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },
    /// Attach to an existing chat by id or path (`/chat/42`).
    Open { chat: ChatId },
    /// List your chats.
    List,
    Rename { chat: ChatId, title: String },
    Delete { chat: ChatId },
    /// Store the bearer token used for every request.
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forget the stored token.
    Logout,
}

pub fn parse() -> Args {
    Args::parse()
}
