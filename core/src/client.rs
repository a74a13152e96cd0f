/// External collaborator contract — the marketplace backend as seen by the
/// synchronization engine. Request/response only; retry policy, if any,
/// lives in the poller, never here.
use crate::error::Result;
use crate::types::{Conversation, Message, RawNotificationRecord};
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    /// All conversations the user participates in
    async fn fetch_conversations(&self, user_id: u64) -> Result<Vec<Conversation>>;

    /// Full message history of one conversation
    async fn fetch_messages(&self, conversation_id: u64) -> Result<Vec<Message>>;

    /// Both notification feeds (postulations and matches) for the user
    async fn fetch_notifications(&self, user_id: u64) -> Result<Vec<RawNotificationRecord>>;

    /// Send a message; the server assigns id and timestamp and returns the
    /// canonical copy
    async fn send_message(
        &self,
        conversation_id: u64,
        sender_id: u64,
        text: Option<String>,
        attachment: Option<Bytes>,
    ) -> Result<Message>;

    /// Resolve the conversation shared with another user about a given pet
    async fn find_conversation(&self, other_user_id: u64, pet_name: &str)
        -> Result<Option<u64>>;
}
