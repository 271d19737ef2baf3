use std::sync::Arc;

use grocery::{parse, GroceryStore, ReconcileConfig, ReconcileWorker};
use shared::{
    domain::{ChannelId, GuildId},
    error::GroceryError,
};
use tracing::{debug, error};

mod grohere;
mod handlers;
pub mod messaging;

pub use messaging::MessagingClient;

#[derive(Clone)]
pub struct BotContext {
    pub store: Arc<dyn GroceryStore>,
    pub messenger: Arc<dyn MessagingClient>,
    pub reconciler: Arc<ReconcileWorker>,
}

impl BotContext {
    pub fn new(
        store: Arc<dyn GroceryStore>,
        messenger: Arc<dyn MessagingClient>,
        reconcile: ReconcileConfig,
    ) -> Self {
        let reconciler = Arc::new(ReconcileWorker::new(Arc::clone(&store), reconcile));
        Self {
            store,
            messenger,
            reconciler,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    /// Display name of the sender, recorded as the entry's last editor.
    pub author: String,
    pub content: String,
}

/// Runs one chat message through the bot and sends at most one reply.
pub async fn handle_message(ctx: &BotContext, msg: &IncomingMessage) {
    let Some(reply) = process_message(ctx, msg).await else {
        return;
    };
    if let Err(error) = ctx.messenger.send_message(msg.channel_id, &reply).await {
        error!(channel_id = %msg.channel_id, ?error, "failed to send reply");
    }
}

/// Parses and executes a message, returning the reply text if there is one.
pub async fn process_message(ctx: &BotContext, msg: &IncomingMessage) -> Option<String> {
    let cmd = match parse(&msg.content) {
        Ok(cmd) => cmd,
        Err(err) => return err.user_message(),
    };
    debug!(
        guild_id = %msg.guild_id,
        command = %cmd.command,
        label = %cmd.label,
        "dispatching command"
    );

    match handlers::dispatch(ctx, msg, &cmd).await {
        Ok(reply) => reply,
        Err(err) => {
            if let GroceryError::StoreFailure(source) = &err {
                error!(
                    guild_id = %msg.guild_id,
                    command = %cmd.command,
                    error = ?source,
                    "store failure while handling command"
                );
            }
            err.user_message()
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
