//! Self-updating "grohere" messages.
//!
//! `!grohere` posts the rendered groceries and remembers the message. Every
//! later change in the guild re-renders each remembered message and edits it
//! in place. Bindings whose message or list has disappeared are forgotten.

use shared::{
    domain::{GroHereBinding, GuildId},
    error::{GroceryError, MessagingError},
};
use tracing::{error, info, warn};

use crate::{handlers::render_for, BotContext, IncomingMessage};

pub(crate) async fn post(
    ctx: &BotContext,
    msg: &IncomingMessage,
    label: &str,
) -> Result<(), GroceryError> {
    let text = render_for(ctx, msg.guild_id, label).await?;
    let message_id = match ctx.messenger.send_message(msg.channel_id, &text).await {
        Ok(message_id) => message_id,
        Err(error) => {
            error!(channel_id = %msg.channel_id, ?error, "failed to post grohere message");
            return Ok(());
        }
    };

    let list_label = (!label.is_empty()).then(|| label.to_string());
    ctx.store
        .save_grohere(GroHereBinding {
            guild_id: msg.guild_id,
            channel_id: msg.channel_id,
            message_id,
            list_label,
        })
        .await?;
    info!(guild_id = %msg.guild_id, %message_id, "bound grohere message");
    Ok(())
}

/// Re-renders every bound message of the guild. Failures are logged, never
/// returned: the command that triggered the refresh already succeeded.
pub(crate) async fn refresh(ctx: &BotContext, guild_id: GuildId) {
    let bindings = match ctx.store.find_grohere(guild_id).await {
        Ok(bindings) => bindings,
        Err(error) => {
            error!(%guild_id, ?error, "failed to load grohere bindings");
            return;
        }
    };

    for binding in bindings {
        let label = binding.list_label.as_deref().unwrap_or_default();
        let text = match render_for(ctx, guild_id, label).await {
            Ok(text) => text,
            Err(GroceryError::ListNotFound(label)) => {
                info!(%guild_id, %label, "list behind grohere message is gone, unbinding");
                forget(ctx, &binding).await;
                continue;
            }
            Err(error) => {
                error!(%guild_id, ?error, "failed to render grohere message");
                continue;
            }
        };

        match ctx
            .messenger
            .edit_message(binding.channel_id, binding.message_id, &text)
            .await
        {
            Ok(()) => {}
            Err(MessagingError::TargetGone) => {
                info!(
                    %guild_id,
                    message_id = %binding.message_id,
                    "grohere message was deleted, unbinding"
                );
                forget(ctx, &binding).await;
            }
            Err(error) => {
                warn!(
                    %guild_id,
                    message_id = %binding.message_id,
                    ?error,
                    "failed to edit grohere message"
                );
            }
        }
    }
}

async fn forget(ctx: &BotContext, binding: &GroHereBinding) {
    if let Err(error) = ctx
        .store
        .delete_grohere(binding.guild_id, binding.list_label.clone())
        .await
    {
        error!(guild_id = %binding.guild_id, ?error, "failed to remove grohere binding");
    }
}
