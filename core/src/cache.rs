/// In-memory conversation state: per-conversation message buffers and the
/// chat-list snapshot. Session-scoped; history is re-fetched on re-open.
use crate::types::{Conversation, Message};
use std::collections::HashMap;

/// Per-conversation ordered message buffers with merge-insert semantics
#[derive(Debug, Default)]
pub struct ConversationCache {
    buffers: HashMap<u64, Vec<Message>>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of messages into a conversation's buffer. Returns how
    /// many actually entered the buffer.
    ///
    /// Callers normally pre-filter through the dedup store, but the buffer
    /// is also scanned by id here: the dedup channel is cleared when a
    /// conversation is re-opened, and the same messages come back on the
    /// next poll. The id scan keeps merge idempotent regardless.
    pub fn merge(&mut self, conversation_id: u64, incoming: Vec<Message>) -> usize {
        let buffer = self.buffers.entry(conversation_id).or_default();
        let mut merged = 0;
        for msg in incoming {
            if buffer.iter().any(|m| m.id == msg.id) {
                continue;
            }
            buffer.push(msg);
            merged += 1;
        }
        if merged > 0 {
            buffer.sort_by_key(Message::sort_key);
        }
        merged
    }

    /// Snapshot of a conversation's buffer, sorted by (timestamp, id)
    pub fn get(&self, conversation_id: u64) -> Vec<Message> {
        self.buffers
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }

}

/// Chat-list snapshot, newest activity first. Conversations are only ever
/// created or updated here; deletion is a server-side concern.
#[derive(Debug, Default)]
pub struct ConversationList {
    items: Vec<Conversation>,
}

impl ConversationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh conversations from a list fetch. Returns the ids
    /// whose last-message timestamp advanced (used for unread derivation).
    pub fn upsert(&mut self, incoming: Vec<Conversation>) -> Vec<u64> {
        let mut advanced = Vec::new();
        for conv in incoming {
            match self.items.iter_mut().find(|c| c.id == conv.id) {
                Some(existing) => {
                    if conv.last_timestamp > existing.last_timestamp {
                        advanced.push(conv.id);
                    }
                    *existing = conv;
                }
                None => self.items.push(conv),
            }
        }
        self.items
            .sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));
        advanced
    }

    pub fn snapshot(&self) -> Vec<Conversation> {
        self.items.clone()
    }
}
