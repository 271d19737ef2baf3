use std::{
    collections::HashSet,
    sync::atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use bot_api::MessagingClient;
use shared::{
    domain::{ChannelId, MessageId},
    error::MessagingError,
};
use tokio::sync::Mutex;
use tracing::debug;

/// Messaging client that prints to stdout. It remembers which message ids it
/// has posted so edits to unknown or deleted messages fail like they would on
/// a real chat platform.
#[derive(Default)]
pub struct ConsoleMessenger {
    next_id: AtomicI64,
    live: Mutex<HashSet<MessageId>>,
}

impl ConsoleMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates someone deleting a posted message. Returns false when the
    /// id was never posted or is already gone.
    pub async fn delete(&self, message_id: MessageId) -> bool {
        self.live.lock().await.remove(&message_id)
    }
}

#[async_trait]
impl MessagingClient for ConsoleMessenger {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        text: &str,
    ) -> Result<MessageId, MessagingError> {
        let message_id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.live.lock().await.insert(message_id);
        println!("[#{channel_id} msg {message_id}]\n{text}\n");
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), MessagingError> {
        if !self.live.lock().await.contains(&message_id) {
            debug!(%channel_id, %message_id, "edit of a message that is gone");
            return Err(MessagingError::TargetGone);
        }
        println!("[#{channel_id} msg {message_id} edited]\n{text}\n");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
