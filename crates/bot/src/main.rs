use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use bot_api::{handle_message, BotContext, IncomingMessage};
use clap::Parser;
use shared::domain::{ChannelId, GuildId, MessageId};
use storage::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod console;

use config::{load_settings, DEFAULT_CONFIG_PATH};
use console::ConsoleMessenger;

/// Grocery list bot wired to the terminal: each stdin line is one chat
/// message in the configured guild and channel.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Name recorded as the last editor of entries you touch.
    #[arg(long)]
    author: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum ConsoleInput {
    Quit,
    /// Pretend a posted message was deleted by a user.
    DeleteMessage(MessageId),
    Chat(String),
}

fn parse_input(line: &str) -> Option<ConsoleInput> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "/quit" {
        return Some(ConsoleInput::Quit);
    }
    if let Some(raw_id) = trimmed.strip_prefix("/delete ") {
        return raw_id
            .trim()
            .parse()
            .ok()
            .map(|id| ConsoleInput::DeleteMessage(MessageId(id)));
    }
    // a literal `\n` stands in for a line break so one line can add several items
    Some(ConsoleInput::Chat(line.replace("\\n", "\n")))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;
    if let Some(author) = args.author {
        settings.author = author;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let storage = Storage::new();
    storage.health_check().await?;
    let messenger = Arc::new(ConsoleMessenger::new());
    let ctx = BotContext::new(
        Arc::new(storage),
        messenger.clone(),
        settings.reconcile_config(),
    );
    info!(
        guild_id = settings.guild_id,
        channel_id = settings.channel_id,
        author = %settings.author,
        "grocery bot ready, type `!grohelp` to start"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_input(&line) {
            None => {}
            Some(ConsoleInput::Quit) => break,
            Some(ConsoleInput::DeleteMessage(message_id)) => {
                if !messenger.delete(message_id).await {
                    warn!(%message_id, "no such message");
                }
            }
            Some(ConsoleInput::Chat(content)) => {
                let msg = IncomingMessage {
                    guild_id: GuildId(settings.guild_id),
                    channel_id: ChannelId(settings.channel_id),
                    author: settings.author.clone(),
                    content,
                };
                handle_message(&ctx, &msg).await;
            }
        }
    }

    info!("shutting down");
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
