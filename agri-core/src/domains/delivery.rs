use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{id_string, DateRange};
use crate::client::{Endpoints, ResourceClient};
use crate::config::RefreshConfig;
use crate::dispatcher::{Dispatcher, Intent};
use crate::error::ApiError;
use crate::poller::{refresh_resource, PollerHandle};
use crate::resource::{Identified, Resource};
use crate::status::MutationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Assigned,
    PickedUp,
    OutForDelivery,
    Delivered,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTask {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub order_id: String,
    pub customer_name: String,
    pub address: String,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<String>,
}

impl Identified for DeliveryTask {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDashboard {
    #[serde(default)]
    pub assigned: u32,
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub pending: u32,
    #[serde(default)]
    pub earnings: Option<f64>,
}

impl Identified for DeliveryDashboard {
    fn id(&self) -> String {
        "dashboard".to_owned()
    }
}

/// Delivery agent's screens: today's run, history and counters.
#[derive(Clone)]
pub struct Delivery {
    today: ResourceClient<DeliveryTask>,
    history: ResourceClient<DeliveryTask>,
    dashboard: ResourceClient<DeliveryDashboard>,
}

impl Delivery {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let today = Endpoints {
            list: "delivery/tasks/today".to_owned(),
            ..Endpoints::rest("delivery/tasks")
        }
        .with_update_method(Method::PATCH);
        Self {
            today: ResourceClient::new(dispatcher.clone(), "deliveryTasks", today),
            history: ResourceClient::new(dispatcher.clone(), "deliveryHistory", Endpoints::rest("delivery/history")),
            dashboard: ResourceClient::new(dispatcher, "deliveryDashboard", Endpoints::single("delivery/dashboard")),
        }
    }

    pub async fn today_state(&self) -> Resource<DeliveryTask> {
        self.today.state().await
    }

    pub async fn history_state(&self) -> Resource<DeliveryTask> {
        self.history.state().await
    }

    pub async fn fetch_today(&self) -> Result<Vec<DeliveryTask>, ApiError> {
        self.today.fetch().await
    }

    pub async fn fetch_history(&self, range: DateRange) -> Result<Vec<DeliveryTask>, ApiError> {
        self.history.fetch_with(range.query()).await
    }

    pub async fn fetch_dashboard(&self) -> Result<DeliveryDashboard, ApiError> {
        self.dashboard.fetch_one("dashboard").await
    }

    pub async fn dashboard(&self) -> Option<DeliveryDashboard> {
        self.dashboard.state().await.current().cloned()
    }

    pub async fn set_status(&self, task_id: &str, status: DeliveryStatus) -> Result<DeliveryTask, ApiError> {
        let intent = Intent::new(Method::PATCH, format!("delivery/tasks/{task_id}/status"))
            .json(json!({ "status": status }));
        self.today
            .run(MutationKind::Update, intent, |store, ticket, payload| {
                let task: DeliveryTask = payload.data_as()?;
                store.updated(ticket, task.clone(), payload.message);
                Ok(task)
            })
            .await
    }

    /// Re-fetch today's tasks in the background.
    pub fn auto_refresh(&self, config: &RefreshConfig) -> PollerHandle {
        refresh_resource(self.today.clone(), config)
    }
}
