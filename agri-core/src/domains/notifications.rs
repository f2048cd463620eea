use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{id_string, require};
use crate::client::{Endpoints, ResourceClient};
use crate::dispatcher::{Dispatcher, Intent};
use crate::envelope::Payload;
use crate::error::ApiError;
use crate::poller::{spawn_inbox, PollerHandle};
use crate::resource::{Identified, Resource};
use crate::status::MutationKind;
use crate::storage::FCM_TOKEN_KEY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Value,
}

impl Notification {
    /// Build from a push message delivered by the messaging provider.
    pub fn from_push(message_id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: message_id.into(),
            title: title.into(),
            body: body.into(),
            read: false,
            received_at: Some(Utc::now()),
            data: Value::Null,
        }
    }
}

impl Identified for Notification {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Clone)]
pub struct Notifications {
    client: ResourceClient<Notification>,
}

impl Notifications {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            client: ResourceClient::new(dispatcher, "notifications", Endpoints::rest("notifications")),
        }
    }

    pub fn client(&self) -> &ResourceClient<Notification> {
        &self.client
    }

    pub async fn state(&self) -> Resource<Notification> {
        self.client.state().await
    }

    pub async fn fetch(&self) -> Result<Vec<Notification>, ApiError> {
        self.client.fetch().await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(id).await
    }

    pub async fn unread_count(&self) -> usize {
        self.client
            .store()
            .read()
            .await
            .items()
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub async fn mark_read(&self, id: &str) -> Result<(), ApiError> {
        let intent = Intent::new(Method::PATCH, format!("notifications/{id}/read"));
        let id = id.to_owned();
        self.client
            .run(MutationKind::Update, intent, move |store, ticket, payload| {
                if store.settled(ticket, payload.message) {
                    store.modify(&id, |n| n.read = true);
                }
                Ok(())
            })
            .await
    }

    /// Store the device push token locally and register it with the backend.
    pub async fn register_device_token(&self, token: &str) -> Result<Payload, ApiError> {
        require("Device token", token)?;
        let dispatcher = self.client.dispatcher();
        if let Err(e) = dispatcher.tokens().set(FCM_TOKEN_KEY, token).await {
            warn!(error = %e, "failed to persist device token");
        }
        let payload = dispatcher
            .dispatch(Intent::post("fcm-token").json(json!({ "fcm_token": token })))
            .await?;
        info!("device token registered");
        Ok(payload)
    }

    /// Append inbound push messages to the list until stopped.
    pub fn listen(&self, inbound: mpsc::Receiver<Notification>) -> PollerHandle {
        spawn_inbox(self.client.store(), inbound)
    }
}
