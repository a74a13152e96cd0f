/// Synchronization engine — keeps chat and notification state consistent
/// with the marketplace backend using periodic polling.
///
/// One instance per logged-in session, constructed with an injected
/// backend client and torn down on logout. All caches are owned here and
/// mutated only through `&self` methods behind their own locks.
use crate::cache::{ConversationCache, ConversationList};
use crate::client::MarketplaceClient;
use crate::config::SyncConfig;
use crate::dedup::{self, DedupStore};
use crate::error::{Result, SyncError};
use crate::poller::{Liveness, PollerScheduler};
use crate::router::NotificationRouter;
use crate::seen_store::{SeenSet, SeenStore};
use crate::types::{Action, Conversation, Message, Notification, SyncEvent};
use crate::unread::UnreadCounters;
use bytes::Bytes;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Holds a conversation's single send slot for the duration of one send.
/// Released on drop, so the slot comes back even when the caller's future
/// is cancelled mid-send (timeout, select, task abort).
struct SendSlot {
    conversation_id: u64,
    in_flight: Arc<Mutex<HashSet<u64>>>,
}

impl SendSlot {
    /// Claim the slot; `None` if a send is already in flight
    fn acquire(in_flight: &Arc<Mutex<HashSet<u64>>>, conversation_id: u64) -> Option<Self> {
        let mut slots = in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !slots.insert(conversation_id) {
            return None;
        }
        Some(Self {
            conversation_id,
            in_flight: in_flight.clone(),
        })
    }
}

impl Drop for SendSlot {
    fn drop(&mut self) {
        let mut slots = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(&self.conversation_id);
    }
}

pub struct SyncEngine {
    /// Logged-in user this session belongs to
    pub user_id: u64,

    config: SyncConfig,
    client: Arc<dyn MarketplaceClient>,
    router: Arc<NotificationRouter>,
    scheduler: Arc<PollerScheduler>,

    dedup: Arc<RwLock<DedupStore>>,
    cache: Arc<RwLock<ConversationCache>>,
    conversations: Arc<RwLock<ConversationList>>,
    notifications: Arc<RwLock<Vec<Notification>>>,
    unread: Arc<RwLock<UnreadCounters>>,
    last_unread: Arc<RwLock<u64>>,

    seen_store: SeenStore,
    seen: Arc<RwLock<SeenSet>>,

    active_conversation: Arc<RwLock<Option<u64>>>,
    in_flight_sends: Arc<Mutex<HashSet<u64>>>,

    events: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create an engine for one user session. Opens the durable seen-state
    /// record and loads the user's acknowledged notification ids.
    pub fn new(
        user_id: u64,
        config: SyncConfig,
        client: Arc<dyn MarketplaceClient>,
    ) -> Result<Self> {
        let data_dir = config
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".patitas").join(format!("user-{}", user_id)));
        std::fs::create_dir_all(&data_dir)?;

        let seen_store = SeenStore::new(&data_dir)?;
        let seen = seen_store.load(user_id);
        info!(
            "Created sync engine for user {} ({} acknowledged notifications on record)",
            user_id,
            seen.len()
        );

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            user_id,
            config,
            router: Arc::new(NotificationRouter::new(client.clone())),
            client,
            scheduler: Arc::new(PollerScheduler::new()),
            dedup: Arc::new(RwLock::new(DedupStore::new())),
            cache: Arc::new(RwLock::new(ConversationCache::new())),
            conversations: Arc::new(RwLock::new(ConversationList::new())),
            notifications: Arc::new(RwLock::new(Vec::new())),
            unread: Arc::new(RwLock::new(UnreadCounters::new())),
            last_unread: Arc::new(RwLock::new(0)),
            seen_store,
            seen: Arc::new(RwLock::new(seen)),
            active_conversation: Arc::new(RwLock::new(None)),
            in_flight_sends: Arc::new(Mutex::new(HashSet::new())),
            events,
        })
    }

    /// Start the session-level feeds: chat list, notifications, unread badge.
    /// The active-conversation message feed starts when a conversation is
    /// selected.
    pub async fn start(&self) {
        info!("Starting sync engine for user {}", self.user_id);

        let engine = self.clone();
        self.scheduler
            .start(dedup::CHAT_LIST, self.config.chat_list_interval, move |live| {
                let engine = engine.clone();
                async move { engine.poll_chat_list(live).await }
            })
            .await;

        let engine = self.clone();
        self.scheduler
            .start(
                dedup::NOTIFICATIONS,
                self.config.notification_interval,
                move |live| {
                    let engine = engine.clone();
                    async move { engine.poll_notifications(live).await }
                },
            )
            .await;

        let engine = self.clone();
        self.scheduler
            .start(dedup::UNREAD, self.config.unread_interval, move |live| {
                let engine = engine.clone();
                async move { engine.poll_unread(live).await }
            })
            .await;
    }

    /// Stop every poll loop and flush durable state
    pub async fn shutdown(&self) {
        info!("Shutting down sync engine for user {}", self.user_id);
        self.scheduler.stop_all().await;
        self.seen_store.flush();
    }

    /// Subscribe to engine events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    // ─── Active conversation lifecycle ───────────────────────────────────

    /// Select (or deselect) the open conversation. The previous
    /// conversation's message poller is stopped and its dedup channel
    /// cleared; re-opening later re-fetches the full history and relies on
    /// message ids to avoid duplicate rows. Selecting the same conversation
    /// again is a no-op.
    pub async fn set_active_conversation(&self, next: Option<u64>) {
        let prev = {
            let mut active = self.active_conversation.write().await;
            std::mem::replace(&mut *active, next)
        };
        if prev == next {
            return;
        }

        if let Some(old) = prev {
            let channel = dedup::messages_channel(old);
            self.scheduler.stop(&channel).await;
            self.dedup.write().await.clear_channel(&channel);
            debug!("Left conversation {}", old);
        }

        if let Some(cid) = next {
            self.unread.write().await.clear_conversation(cid);
            let engine = self.clone();
            self.scheduler
                .start(
                    &dedup::messages_channel(cid),
                    self.config.message_interval,
                    move |live| {
                        let engine = engine.clone();
                        async move { engine.poll_messages(cid, live).await }
                    },
                )
                .await;
            info!("Opened conversation {}", cid);
        }
    }

    pub async fn active_conversation(&self) -> Option<u64> {
        *self.active_conversation.read().await
    }

    // ─── Poll ticks ──────────────────────────────────────────────────────

    async fn poll_chat_list(&self, live: Liveness) -> Result<()> {
        let fetched = self.client.fetch_conversations(self.user_id).await?;
        if !live.is_live().await {
            debug!("Discarding chat-list batch (poller stopped)");
            return Ok(());
        }

        let observed: Vec<u64> = fetched.iter().map(|c| c.id).collect();
        let new_count = {
            let mut dedup = self.dedup.write().await;
            dedup
                .filter_new(dedup::CHAT_LIST, observed, |id| id.to_string())
                .len()
        };

        let advanced = self.conversations.write().await.upsert(fetched);

        // A fresher last-message timestamp on a conversation we are not
        // looking at counts toward its unread badge
        if !advanced.is_empty() {
            let active = *self.active_conversation.read().await;
            let mut unread = self.unread.write().await;
            for cid in &advanced {
                if Some(*cid) != active {
                    unread.add_messages(*cid, 1);
                }
            }
        }

        if new_count > 0 || !advanced.is_empty() {
            self.emit(SyncEvent::ConversationsUpdated { new_count });
        }
        Ok(())
    }

    async fn poll_messages(&self, conversation_id: u64, live: Liveness) -> Result<()> {
        let fetched = self.client.fetch_messages(conversation_id).await?;
        if !live.is_live().await {
            debug!(
                "Discarding message batch for conversation {} (poller stopped)",
                conversation_id
            );
            return Ok(());
        }

        let channel = dedup::messages_channel(conversation_id);
        let fresh = {
            let mut dedup = self.dedup.write().await;
            dedup.filter_new(&channel, fetched, |m| m.id.to_string())
        };
        if fresh.is_empty() {
            return Ok(());
        }

        let merged = self.cache.write().await.merge(conversation_id, fresh);
        if merged > 0 {
            self.emit(SyncEvent::NewMessages {
                conversation_id,
                count: merged,
            });
        }
        Ok(())
    }

    async fn poll_notifications(&self, live: Liveness) -> Result<()> {
        let fetched = self.client.fetch_notifications(self.user_id).await?;
        if !live.is_live().await {
            debug!("Discarding notification batch (poller stopped)");
            return Ok(());
        }

        let classified: Vec<Notification> = fetched
            .iter()
            .map(NotificationRouter::classify)
            .collect();

        // Durably acknowledged ids never re-surface, then the session dedup
        // set drops anything already in the unseen collection
        let candidates = {
            let seen = self.seen.read().await;
            classified
                .into_iter()
                .filter(|n| !seen.contains(&n.id))
                .collect::<Vec<_>>()
        };
        let fresh = {
            let mut dedup = self.dedup.write().await;
            dedup.filter_new(dedup::NOTIFICATIONS, candidates, |n| n.id.clone())
        };
        if fresh.is_empty() {
            return Ok(());
        }

        let unseen = {
            let mut notifications = self.notifications.write().await;
            self.unread
                .write()
                .await
                .increment_notifications(fresh.len() as u64);
            notifications.extend(fresh);
            notifications.len()
        };
        self.emit(SyncEvent::NotificationsUpdated { unseen });
        Ok(())
    }

    /// Recompute the aggregate badge from local state; no fetch involved
    async fn poll_unread(&self, live: Liveness) -> Result<()> {
        if !live.is_live().await {
            return Ok(());
        }
        let total = self.unread.read().await.total();
        let mut last = self.last_unread.write().await;
        if *last != total {
            *last = total;
            self.emit(SyncEvent::UnreadChanged { total });
        }
        Ok(())
    }

    // ─── Notifications ───────────────────────────────────────────────────

    /// Handle a click on an unseen notification. Removal from the unseen
    /// collection, the badge decrement, and the durable acknowledgement all
    /// happen before the action lookup, so a failed lookup can never
    /// re-surface the notification. Returns `None` if the id is not in the
    /// unseen collection.
    pub async fn acknowledge_notification(&self, notification_id: &str) -> Option<Action> {
        let notification = {
            let mut list = self.notifications.write().await;
            let pos = list.iter().position(|n| n.id == notification_id)?;
            list.remove(pos)
        };

        self.unread.write().await.decrement_notification();

        {
            let mut seen = self.seen.write().await;
            seen.insert(notification.id.clone());
            self.seen_store
                .save(self.user_id, &mut seen, self.config.seen_cap);
        }

        let unseen = self.notifications.read().await.len();
        self.emit(SyncEvent::NotificationsUpdated { unseen });

        Some(self.router.resolve_action(&notification).await)
    }

    // ─── Outbound submit ─────────────────────────────────────────────────

    /// Send a message to the currently open conversation. At most one send
    /// may be in flight per conversation; a second call while one is pending
    /// is rejected, not queued. On success the server's copy (its id, its
    /// timestamp) is merged into the cache and pre-marked in the dedup
    /// channel so the next poll tick does not duplicate it. On failure the
    /// error is returned and the caller keeps its input for a retry.
    pub async fn send_message(
        &self,
        conversation_id: u64,
        text: Option<String>,
        attachment: Option<Bytes>,
    ) -> Result<Message> {
        let has_text = text.as_deref().map(str::trim).is_some_and(|t| !t.is_empty());
        if !has_text && attachment.is_none() {
            return Err(SyncError::Submit(
                "nothing to send: no text or attachment".to_string(),
            ));
        }
        if *self.active_conversation.read().await != Some(conversation_id) {
            return Err(SyncError::Submit(format!(
                "conversation {} is not selected",
                conversation_id
            )));
        }
        let _slot = match SendSlot::acquire(&self.in_flight_sends, conversation_id) {
            Some(slot) => slot,
            None => {
                return Err(SyncError::Submit(format!(
                    "a send is already in flight for conversation {}",
                    conversation_id
                )))
            }
        };

        let message = self
            .client
            .send_message(conversation_id, self.user_id, text, attachment)
            .await?;

        {
            let channel = dedup::messages_channel(conversation_id);
            let mut dedup = self.dedup.write().await;
            dedup.mark_seen(&channel, &message.id.to_string());
        }
        self.cache
            .write()
            .await
            .merge(conversation_id, vec![message.clone()]);

        debug!(
            "Sent message {} to conversation {}",
            message.id, conversation_id
        );
        self.emit(SyncEvent::MessageSent {
            message: message.clone(),
        });
        Ok(message)
    }

    // ─── Read-only snapshots ─────────────────────────────────────────────

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.conversations.read().await.snapshot()
    }

    pub async fn messages(&self, conversation_id: u64) -> Vec<Message> {
        self.cache.read().await.get(conversation_id)
    }

    pub async fn unseen_notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    pub async fn unread_total(&self) -> u64 {
        self.unread.read().await.total()
    }

    pub async fn unread_notifications(&self) -> u64 {
        self.unread.read().await.notifications()
    }

    pub async fn unread_for(&self, conversation_id: u64) -> u64 {
        self.unread.read().await.conversation(conversation_id)
    }

    fn emit(&self, event: SyncEvent) {
        // No receivers is fine; events are advisory
        let _ = self.events.send(event);
    }
}

impl Clone for SyncEngine {
    fn clone(&self) -> Self {
        Self {
            user_id: self.user_id,
            config: self.config.clone(),
            client: self.client.clone(),
            router: self.router.clone(),
            scheduler: self.scheduler.clone(),
            dedup: self.dedup.clone(),
            cache: self.cache.clone(),
            conversations: self.conversations.clone(),
            notifications: self.notifications.clone(),
            unread: self.unread.clone(),
            last_unread: self.last_unread.clone(),
            seen_store: self.seen_store.clone(),
            seen: self.seen.clone(),
            active_conversation: self.active_conversation.clone(),
            in_flight_sends: self.in_flight_sends.clone(),
            events: self.events.clone(),
        }
    }
}
