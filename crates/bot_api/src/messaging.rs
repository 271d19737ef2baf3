use async_trait::async_trait;
use shared::{
    domain::{ChannelId, MessageId},
    error::MessagingError,
};

/// The slice of the chat platform the bot needs: post a message and later
/// rewrite it in place.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        text: &str,
    ) -> Result<MessageId, MessagingError>;

    /// Fails with [`MessagingError::TargetGone`] once the message or its
    /// channel has been deleted.
    async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), MessagingError>;
}
