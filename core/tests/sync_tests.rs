/// Component tests for dedup, caches, counters, seen-state, and routing

extern crate patitas_core;

use chrono::DateTime;
use patitas_core::cache::{ConversationCache, ConversationList};
use patitas_core::dedup::{self, DedupStore};
use patitas_core::router::NotificationRouter;
use patitas_core::seen_store::{SeenSet, SeenStore};
use patitas_core::types::{Conversation, Message, NotificationFeed, RawNotificationRecord};
use patitas_core::unread::UnreadCounters;

fn msg(id: u64, conversation_id: u64, t: i64) -> Message {
    Message {
        id,
        conversation_id,
        sender_id: 5,
        text: Some(format!("message {}", id)),
        attachment_url: None,
        created_at: DateTime::from_timestamp(t, 0).unwrap(),
    }
}

fn conv(id: u64, t: i64) -> Conversation {
    Conversation {
        id,
        display_name: format!("user {}", id),
        pet_name: Some("Luna".to_string()),
        last_preview: "hola".to_string(),
        last_timestamp: DateTime::from_timestamp(t, 0).unwrap(),
    }
}

#[test]
fn dedup_filter_new_is_idempotent() {
    let mut dedup = DedupStore::new();
    let batch = vec![1u64, 2, 3];

    let first = dedup.filter_new("chat_list", batch.clone(), |id| id.to_string());
    assert_eq!(first, vec![1, 2, 3]); // input order preserved

    let second = dedup.filter_new("chat_list", batch, |id| id.to_string());
    assert!(second.is_empty());
}

#[test]
fn dedup_channels_are_independent() {
    let mut dedup = DedupStore::new();
    dedup.mark_seen("notifications", "7");

    assert!(dedup.has_seen("notifications", "7"));
    assert!(!dedup.has_seen("chat_list", "7"));

    dedup.clear_channel("notifications");
    assert!(!dedup.has_seen("notifications", "7"));
}

#[test]
fn merge_sorts_by_timestamp_then_id() {
    let mut cache = ConversationCache::new();

    // Arrival order id:1(t=10), id:2(t=5) must display as [2, 1]
    cache.merge(42, vec![msg(1, 42, 10), msg(2, 42, 5)]);
    let buffer = cache.get(42);
    assert_eq!(buffer.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2, 1]);

    // Equal timestamps fall back to id order
    cache.merge(42, vec![msg(4, 42, 5), msg(3, 42, 5)]);
    let buffer = cache.get(42);
    assert_eq!(
        buffer.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![2, 3, 4, 1]
    );
}

#[test]
fn merge_is_idempotent_without_dedup_help() {
    let mut cache = ConversationCache::new();
    let batch = vec![msg(1, 42, 10), msg(2, 42, 5)];

    // The dedup channel may have been cleared by a conversation re-open, so
    // the buffer itself must reject duplicate ids
    assert_eq!(cache.merge(42, batch.clone()), 2);
    assert_eq!(cache.merge(42, batch), 0);
    assert_eq!(cache.get(42).len(), 2);
}

#[test]
fn snapshot_mutation_does_not_affect_cache() {
    let mut cache = ConversationCache::new();
    cache.merge(42, vec![msg(1, 42, 10)]);

    let mut snapshot = cache.get(42);
    snapshot.clear();

    assert_eq!(cache.get(42).len(), 1);
}

#[test]
fn conversation_list_orders_by_latest_activity() {
    let mut list = ConversationList::new();
    list.upsert(vec![conv(1, 100), conv(2, 200)]);

    let snapshot = list.snapshot();
    assert_eq!(snapshot.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 1]);

    // A fresher last message moves a conversation up and is reported
    let advanced = list.upsert(vec![conv(1, 300)]);
    assert_eq!(advanced, vec![1]);
    let snapshot = list.snapshot();
    assert_eq!(snapshot.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);

    // Same timestamp again is an update, not an advance
    let advanced = list.upsert(vec![conv(1, 300)]);
    assert!(advanced.is_empty());
}

#[test]
fn unread_counters_never_go_negative() {
    let mut unread = UnreadCounters::new();
    unread.increment_notifications(1);
    unread.decrement_notification();
    unread.decrement_notification();
    unread.decrement_notification();
    assert_eq!(unread.notifications(), 0);
    assert_eq!(unread.total(), 0);
}

#[test]
fn unread_total_aggregates_messages_and_notifications() {
    let mut unread = UnreadCounters::new();
    unread.add_messages(1, 2);
    unread.add_messages(2, 1);
    unread.increment_notifications(3);
    assert_eq!(unread.total(), 6);

    unread.clear_conversation(1);
    assert_eq!(unread.total(), 4);
    assert_eq!(unread.conversation(1), 0);
}

#[test]
fn seen_set_drops_oldest_at_cap() {
    let mut seen = SeenSet::default();
    for i in 0..10 {
        seen.insert(format!("match:{}", i));
    }
    seen.truncate_to(4);

    assert_eq!(seen.len(), 4);
    assert!(!seen.contains("match:5"));
    assert!(seen.contains("match:6"));
    assert!(seen.contains("match:9"));
}

#[test]
fn seen_store_roundtrip_and_missing_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = SeenStore::new(dir.path()).unwrap();

    // Absent record loads as empty, never errors
    assert!(store.load(1).is_empty());

    let mut seen = SeenSet::default();
    seen.insert("adoption:7".to_string());
    seen.insert("match:7".to_string());
    store.save(1, &mut seen, 4096);

    let loaded = store.load(1);
    assert_eq!(loaded.len(), 2);
    assert!(loaded.contains("adoption:7"));
    assert!(loaded.contains("match:7"));

    // Partitioned per user
    assert!(store.load(2).is_empty());
}

#[test]
fn seen_store_save_applies_cap() {
    let dir = tempfile::tempdir().unwrap();
    let store = SeenStore::new(dir.path()).unwrap();

    let mut seen = SeenSet::default();
    for i in 0..10 {
        seen.insert(format!("match:{}", i));
    }
    store.save(1, &mut seen, 3);

    let loaded = store.load(1);
    assert_eq!(loaded.len(), 3);
    assert!(loaded.contains("match:9"));
    assert!(!loaded.contains("match:0"));
}

#[test]
fn classify_qualifies_ids_per_category() {
    let postulation = RawNotificationRecord {
        id: 7,
        feed: NotificationFeed::Postulation,
        user_name: "María".to_string(),
        user_id: 5,
        pet_name: "Luna".to_string(),
    };
    let matched = RawNotificationRecord {
        id: 7,
        feed: NotificationFeed::Match,
        ..postulation.clone()
    };

    let a = NotificationRouter::classify(&postulation);
    let b = NotificationRouter::classify(&matched);

    // Same raw id, different feeds: ids must not collide
    assert_eq!(a.id, "adoption:7");
    assert_eq!(b.id, "match:7");
    assert_ne!(a.id, b.id);

    // Both survive in a dedup channel together
    let mut dedup = DedupStore::new();
    let fresh = dedup.filter_new(dedup::NOTIFICATIONS, vec![a, b], |n| n.id.clone());
    assert_eq!(fresh.len(), 2);
}
