/// Patitas sync demo - Main entry point
///
/// Runs the synchronization engine against an in-memory marketplace backend
/// so the polling loops, dedup, and notification flow can be observed from
/// the log output.
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use patitas_core::client::MarketplaceClient;
use patitas_core::types::{Conversation, Message, NotificationFeed, RawNotificationRecord};
use patitas_core::{SyncConfig, SyncEngine};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_USER: u64 = 1;
const DEMO_CONVERSATION: u64 = 42;

/// In-memory stand-in for the marketplace backend
struct MemoryMarketplace {
    conversations: Mutex<Vec<Conversation>>,
    messages: Mutex<Vec<Message>>,
    notifications: Mutex<Vec<RawNotificationRecord>>,
    next_message_id: AtomicU64,
}

impl MemoryMarketplace {
    fn seeded() -> Self {
        let conversations = vec![Conversation {
            id: DEMO_CONVERSATION,
            display_name: "María".to_string(),
            pet_name: Some("Luna".to_string()),
            last_preview: "¿Sigue disponible?".to_string(),
            last_timestamp: Utc::now(),
        }];
        let messages = vec![Message {
            id: 1,
            conversation_id: DEMO_CONVERSATION,
            sender_id: 5,
            text: Some("¿Sigue disponible?".to_string()),
            attachment_url: None,
            created_at: Utc::now(),
        }];
        let notifications = vec![
            RawNotificationRecord {
                id: 7,
                feed: NotificationFeed::Postulation,
                user_name: "María".to_string(),
                user_id: 5,
                pet_name: "Luna".to_string(),
            },
            RawNotificationRecord {
                id: 7,
                feed: NotificationFeed::Match,
                user_name: "María".to_string(),
                user_id: 5,
                pet_name: "Luna".to_string(),
            },
        ];
        Self {
            conversations: Mutex::new(conversations),
            messages: Mutex::new(messages),
            notifications: Mutex::new(notifications),
            next_message_id: AtomicU64::new(2),
        }
    }
}

#[async_trait]
impl MarketplaceClient for MemoryMarketplace {
    async fn fetch_conversations(
        &self,
        _user_id: u64,
    ) -> patitas_core::Result<Vec<Conversation>> {
        Ok(self.conversations.lock().await.clone())
    }

    async fn fetch_messages(&self, conversation_id: u64) -> patitas_core::Result<Vec<Message>> {
        Ok(self
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn fetch_notifications(
        &self,
        _user_id: u64,
    ) -> patitas_core::Result<Vec<RawNotificationRecord>> {
        Ok(self.notifications.lock().await.clone())
    }

    async fn send_message(
        &self,
        conversation_id: u64,
        sender_id: u64,
        text: Option<String>,
        attachment: Option<Bytes>,
    ) -> patitas_core::Result<Message> {
        let message = Message {
            id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            conversation_id,
            sender_id,
            text,
            attachment_url: attachment.map(|_| "https://cdn.patitas.example/demo".to_string()),
            created_at: Utc::now(),
        };
        self.messages.lock().await.push(message.clone());
        Ok(message)
    }

    async fn find_conversation(
        &self,
        _other_user_id: u64,
        pet_name: &str,
    ) -> patitas_core::Result<Option<u64>> {
        Ok(self
            .conversations
            .lock()
            .await
            .iter()
            .find(|c| c.pet_name.as_deref() == Some(pet_name))
            .map(|c| c.id))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let config = SyncConfig::from_env();
    let client = Arc::new(MemoryMarketplace::seeded());

    let engine = SyncEngine::new(DEMO_USER, config, client)
        .map_err(|e| anyhow::anyhow!("Engine setup error: {}", e))?;
    engine.start().await;
    engine.set_active_conversation(Some(DEMO_CONVERSATION)).await;

    // Print the event stream
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!("event: {:?}", event);
        }
    });

    // Send one message so the reconcile path shows up in the logs
    let sent = engine
        .send_message(DEMO_CONVERSATION, Some("hola".to_string()), None)
        .await
        .map_err(|e| anyhow::anyhow!("Send error: {}", e))?;
    info!("Server confirmed message {}", sent.id);

    // Acknowledge the first notification that shows up
    let engine_ack = engine.clone();
    tokio::spawn(async move {
        loop {
            if let Some(n) = engine_ack.unseen_notifications().await.first().cloned() {
                let action = engine_ack.acknowledge_notification(&n.id).await;
                info!("Acknowledged {} -> {:?}", n.id, action);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }
    });

    info!("Demo running; Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    engine.shutdown().await;
    Ok(())
}
