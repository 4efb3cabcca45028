//! Webhook dispatch for relayed events
//!
//! A single long-lived task consumes the relay. For each event it resolves the
//! matching subscriptions and spawns one independent delivery task per
//! subscription. Delivery is best effort:
//! - no retries, no dead-letter queue, no ordering across deliveries
//! - failures, timeouts and non-2xx responses are logged and discarded
//! - a slow subscriber never holds up the loop or other subscribers

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::error::RegistryResult;
use crate::events::{Event, EventType, RelayReceiver};
use crate::types::Webhook;

/// User-Agent sent with every outbound notification.
pub const USER_AGENT: &str = "DevelopersItaliaAPI-Webhook/1.0";

/// Lookup of the subscriptions interested in an entity.
#[cfg_attr(test, mockall::automock)]
pub trait SubscriptionSource: Send + Sync {
    /// Subscriptions for `entity_type` that are either global or scoped to
    /// exactly `entity_id`.
    fn matching_subscriptions(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RegistryResult<Vec<Webhook>>;
}

/// Body of an outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event: EventType,
    pub subject: String,
}

impl Notification {
    pub fn for_event(event: &Event) -> Self {
        Self {
            event: event.event_type,
            subject: event.subject(),
        }
    }
}

/// Turns relayed events into outbound webhook requests.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: Client,
    subscriptions: Arc<dyn SubscriptionSource>,
}

impl WebhookDispatcher {
    /// Create a dispatcher whose deliveries give up after `timeout`.
    pub fn new(subscriptions: Arc<dyn SubscriptionSource>, timeout: Duration) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            subscriptions,
        })
    }

    /// Start the consumer loop on the tokio runtime.
    pub fn spawn(self, receiver: RelayReceiver) -> JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }

    /// Consume events until every relay producer is gone.
    pub async fn run(self, mut receiver: RelayReceiver) {
        tracing::info!("Webhook dispatcher started");

        while let Some(event) = receiver.recv().await {
            match self.dispatch(&event) {
                Ok(deliveries) => {
                    tracing::debug!(
                        event_id = %event.id,
                        subject = %event.subject(),
                        deliveries = deliveries.len(),
                        "Dispatched event"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        event_id = %event.id,
                        subject = %event.subject(),
                        error = %e,
                        "Failed to dispatch webhooks"
                    );
                }
            }
        }

        tracing::info!("Event relay closed, webhook dispatcher stopped");
    }

    /// Spawn one delivery per matching subscription and return immediately.
    ///
    /// The returned handles only exist for callers that want to observe
    /// completion; dropping them leaves the deliveries running.
    pub fn dispatch(&self, event: &Event) -> RegistryResult<Vec<JoinHandle<()>>> {
        let webhooks = self
            .subscriptions
            .matching_subscriptions(&event.entity_type, &event.entity_id)?;

        if webhooks.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::to_vec(&Notification::for_event(event))?;

        let handles = webhooks
            .into_iter()
            .map(|webhook| {
                let client = self.client.clone();
                let body = body.clone();
                let event_id = event.id.clone();
                tokio::spawn(async move { deliver(client, webhook.url, body, event_id).await })
            })
            .collect();

        Ok(handles)
    }
}

/// POST a notification once. The outcome is only logged.
async fn deliver(client: Client, url: String, body: Vec<u8>, event_id: String) {
    let result = client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            tracing::debug!(event_id = %event_id, url = %url, status = response.status().as_u16(), "Webhook delivered");
        }
        Ok(response) => {
            tracing::debug!(
                event_id = %event_id,
                url = %url,
                status = response.status().as_u16(),
                "Webhook endpoint answered with non-success status"
            );
        }
        Err(e) => {
            tracing::warn!(event_id = %event_id, url = %url, error = %e, "Webhook delivery failed");
        }
    }
}
