/// Notification classification and click-action resolution
use crate::client::MarketplaceClient;
use crate::types::{Action, Notification, NotificationFeed, NotificationKind, RawNotificationRecord};
use std::sync::Arc;
use tracing::{debug, warn};

/// Route opened for adoption-request notifications
const ADOPTION_REQUESTS_ROUTE: &str = "/adoptions/requests";

pub struct NotificationRouter {
    client: Arc<dyn MarketplaceClient>,
}

impl NotificationRouter {
    pub fn new(client: Arc<dyn MarketplaceClient>) -> Self {
        Self { client }
    }

    /// Map a raw server record into a classified notification. The id is
    /// qualified with the category so raw numeric ids from different feeds
    /// never collide.
    pub fn classify(raw: &RawNotificationRecord) -> Notification {
        let (kind, prefix) = match raw.feed {
            NotificationFeed::Postulation => (NotificationKind::AdoptionRequest, "adoption"),
            NotificationFeed::Match => (NotificationKind::Match, "match"),
        };
        Notification {
            id: format!("{}:{}", prefix, raw.id),
            kind,
            user_name: raw.user_name.clone(),
            user_id: raw.user_id,
            pet_name: raw.pet_name.clone(),
        }
    }

    /// Resolve what clicking a notification should do. For match
    /// notifications this needs a conversation lookup; a miss or a failed
    /// lookup degrades to opening the unfiltered conversation list, never an
    /// error.
    pub async fn resolve_action(&self, notification: &Notification) -> Action {
        match notification.kind {
            NotificationKind::AdoptionRequest => {
                Action::NavigateTo(ADOPTION_REQUESTS_ROUTE.to_string())
            }
            NotificationKind::Match => {
                match self
                    .client
                    .find_conversation(notification.user_id, &notification.pet_name)
                    .await
                {
                    Ok(Some(conversation_id)) => {
                        debug!(
                            "Resolved notification {} to conversation {}",
                            notification.id, conversation_id
                        );
                        Action::OpenConversation(conversation_id)
                    }
                    Ok(None) => Action::OpenConversationList,
                    Err(e) => {
                        warn!(
                            "Conversation lookup failed for notification {}: {}",
                            notification.id, e
                        );
                        Action::OpenConversationList
                    }
                }
            }
        }
    }
}
