/// Unread badge counters. All decrements saturate at zero.
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct UnreadCounters {
    messages: HashMap<u64, u64>,
    notifications: u64,
}

impl UnreadCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_messages(&mut self, conversation_id: u64, n: u64) {
        *self.messages.entry(conversation_id).or_default() += n;
    }

    /// Opening a conversation clears its message badge
    pub fn clear_conversation(&mut self, conversation_id: u64) {
        self.messages.remove(&conversation_id);
    }

    pub fn conversation(&self, conversation_id: u64) -> u64 {
        self.messages.get(&conversation_id).copied().unwrap_or(0)
    }

    pub fn increment_notifications(&mut self, n: u64) {
        self.notifications += n;
    }

    pub fn decrement_notification(&mut self) {
        self.notifications = self.notifications.saturating_sub(1);
    }

    pub fn notifications(&self) -> u64 {
        self.notifications
    }

    /// Aggregate badge: unseen notifications plus unread messages
    pub fn total(&self) -> u64 {
        self.notifications + self.messages.values().sum::<u64>()
    }
}
