/// Per-channel dedup sets — prevent reprocessing of already-merged items
///
/// Ephemeral, session-scoped state; distinct from the durable seen-state
/// record in `seen_store`. Clearing a channel is how the engine forces a
/// full re-merge (e.g. when a conversation is re-opened).
use std::collections::{HashMap, HashSet};

/// Channel key for the chat-list feed
pub const CHAT_LIST: &str = "chat_list";

/// Channel key for the notification feeds
pub const NOTIFICATIONS: &str = "notifications";

/// Channel key for the unread-badge recompute loop. Scheduler key only;
/// nothing is deduped on this channel.
pub const UNREAD: &str = "unread";

/// Channel key for one conversation's message feed
pub fn messages_channel(conversation_id: u64) -> String {
    format!("messages:{}", conversation_id)
}

#[derive(Debug, Default)]
pub struct DedupStore {
    channels: HashMap<String, HashSet<String>>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_seen(&self, channel: &str, id: &str) -> bool {
        self.channels
            .get(channel)
            .map(|set| set.contains(id))
            .unwrap_or(false)
    }

    pub fn mark_seen(&mut self, channel: &str, id: &str) {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .insert(id.to_string());
    }

    /// Keep only items not yet marked on this channel, marking survivors as a
    /// side effect. Input order is preserved; a second call with the same
    /// batch returns nothing.
    pub fn filter_new<T, F>(&mut self, channel: &str, items: Vec<T>, id_of: F) -> Vec<T>
    where
        F: Fn(&T) -> String,
    {
        let set = self.channels.entry(channel.to_string()).or_default();
        items
            .into_iter()
            .filter(|item| set.insert(id_of(item)))
            .collect()
    }

    /// Drop all state for one channel
    pub fn clear_channel(&mut self, channel: &str) {
        self.channels.remove(channel);
    }
}
