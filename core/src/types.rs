/// Shared types for the synchronization engine
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one conversation thread (for the chat-list view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Server-assigned conversation id
    pub id: u64,
    /// Display name of the other party
    pub display_name: String,
    /// Name of the pet the conversation is about, if any
    pub pet_name: Option<String>,
    /// Preview text of the last message
    pub last_preview: String,
    /// Timestamp of the last message
    pub last_timestamp: DateTime<Utc>,
}

/// A single chat message. Immutable once created; the server assigns the id
/// and the timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub conversation_id: u64,
    pub sender_id: u64,
    pub text: Option<String>,
    /// URL of an uploaded attachment, if any
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Sort key for conversation buffers: timestamp ascending, id breaks ties
    pub fn sort_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.id)
    }
}

/// Which server feed a raw notification record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFeed {
    /// Someone wants to adopt one of the user's pets
    Postulation,
    /// The user matched with a pet owner
    Match,
}

/// A notification record as returned by the server, before classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNotificationRecord {
    /// Raw numeric id; only unique within its feed
    pub id: u64,
    pub feed: NotificationFeed,
    /// Display name of the other party
    pub user_name: String,
    /// Id of the other party
    pub user_id: u64,
    pub pet_name: String,
}

/// Closed set of notification categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AdoptionRequest,
    Match,
}

/// A classified notification with a channel-qualified id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Channel-qualified id, e.g. "adoption:7" or "match:7" — raw ids from
    /// different feeds can collide, qualified ids cannot
    pub id: String,
    pub kind: NotificationKind,
    pub user_name: String,
    pub user_id: u64,
    pub pet_name: String,
}

/// What clicking a notification resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Navigate to an app route (adoption-request notifications)
    NavigateTo(String),
    /// Open the chat surface with this conversation preselected
    OpenConversation(u64),
    /// Open the chat surface without a preselected target (lookup miss)
    OpenConversationList,
}

/// Events broadcast to presentation collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// The chat list changed (new conversations or fresher previews)
    ConversationsUpdated { new_count: usize },
    /// New messages were merged into a conversation buffer
    NewMessages { conversation_id: u64, count: usize },
    /// A message we sent was confirmed by the server
    MessageSent { message: Message },
    /// The unseen notification collection changed
    NotificationsUpdated { unseen: usize },
    /// The aggregate unread badge changed
    UnreadChanged { total: u64 },
}
