use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{form_or_json, id_string, opt_id_string, require, Attachment};
use crate::client::{Endpoints, ResourceClient};
use crate::dispatcher::{Dispatcher, Intent};
use crate::error::ApiError;
use crate::resource::{Identified, Resource};
use crate::status::MutationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// A closed ticket can only be reopened.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        match (self, next) {
            (a, b) if a == b => false,
            (TicketStatus::Closed, TicketStatus::Open) => true,
            (TicketStatus::Closed, _) => false,
            _ => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketReply {
    #[serde(default, deserialize_with = "opt_id_string")]
    pub id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportTicket {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub status: TicketStatus,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default)]
    pub replies: Vec<TicketReply>,
}

impl Identified for SupportTicket {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub priority: Option<String>,
    pub attachment: Option<Attachment>,
}

#[derive(Clone)]
pub struct SupportTickets {
    client: ResourceClient<SupportTicket>,
}

impl SupportTickets {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            client: ResourceClient::new(
                dispatcher,
                "supportTickets",
                Endpoints::rest("support-tickets"),
            ),
        }
    }

    pub fn client(&self) -> &ResourceClient<SupportTicket> {
        &self.client
    }

    pub async fn state(&self) -> Resource<SupportTicket> {
        self.client.state().await
    }

    pub async fn fetch(&self) -> Result<Vec<SupportTicket>, ApiError> {
        self.client.fetch().await
    }

    pub async fn open(&self, id: &str) -> Result<SupportTicket, ApiError> {
        self.client.fetch_one(id).await
    }

    pub async fn create(&self, ticket: NewTicket) -> Result<SupportTicket, ApiError> {
        require("Subject", &ticket.subject)?;
        require("Description", &ticket.description)?;
        let body = form_or_json(
            vec![
                ("subject", Some(ticket.subject)),
                ("description", Some(ticket.description)),
                ("priority", ticket.priority),
            ],
            ticket.attachment.map(|a| ("attachment", a)),
        );
        self.client.create(body).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(id).await
    }

    /// Post to the thread; the server answers with the whole ticket.
    pub async fn reply(&self, id: &str, message: &str) -> Result<SupportTicket, ApiError> {
        require("Reply", message)?;
        let intent = Intent::post(format!("support-tickets/{id}/replies"))
            .json(json!({ "message": message.trim() }));
        self.apply_ticket(intent).await
    }

    pub async fn set_status(&self, id: &str, status: TicketStatus) -> Result<SupportTicket, ApiError> {
        let known = self.client.store().read().await.get(id).map(|t| t.status);
        if let Some(current) = known {
            if !current.can_transition_to(status) {
                return Err(ApiError::InvalidInput(format!(
                    "Cannot move ticket from {} to {}.",
                    current.as_str(),
                    status.as_str()
                )));
            }
        }
        let intent = Intent::new(Method::PATCH, format!("support-tickets/{id}/status"))
            .json(json!({ "status": status }));
        self.apply_ticket(intent).await
    }

    async fn apply_ticket(&self, intent: Intent) -> Result<SupportTicket, ApiError> {
        self.client
            .run(MutationKind::Update, intent, |store, ticket, payload| {
                let item: SupportTicket = payload.data_as()?;
                store.updated(ticket, item.clone(), payload.message);
                Ok(item)
            })
            .await
    }
}
