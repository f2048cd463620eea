use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dispatcher::{Body, Dispatcher, Intent};
use crate::envelope::Payload;
use crate::error::ApiError;
use crate::resource::{shared_resource, Identified, Resource, SharedResource};
use crate::status::{MutationKind, Ticket};

/// Path templates for one REST collection. `{id}` is substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub list: String,
    pub detail: String,
    pub create: String,
    pub update: String,
    pub delete: String,
    pub update_method: Method,
}

impl Endpoints {
    /// `GET/POST base`, `GET/PUT/DELETE base/{id}`.
    pub fn rest(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let item = format!("{base}/{{id}}");
        Self {
            list: base.to_owned(),
            detail: item.clone(),
            create: base.to_owned(),
            update: item.clone(),
            delete: item,
            update_method: Method::PUT,
        }
    }

    /// One fixed path for a singleton resource (profile, dashboard).
    pub fn single(path: &str) -> Self {
        Self {
            list: path.to_owned(),
            detail: path.to_owned(),
            create: path.to_owned(),
            update: path.to_owned(),
            delete: path.to_owned(),
            update_method: Method::PUT,
        }
    }

    pub fn with_update_method(mut self, method: Method) -> Self {
        self.update_method = method;
        self
    }

    pub fn path(template: &str, id: &str) -> String {
        template.replace("{id}", id)
    }
}

/// Generic fetch/create/update/delete client bound to one [`Resource`].
///
/// Each call moves the matching slot to pending, issues exactly one request
/// and applies the outcome under a single write lock.
pub struct ResourceClient<T> {
    dispatcher: Dispatcher,
    endpoints: Endpoints,
    store: SharedResource<T>,
}

impl<T> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            endpoints: self.endpoints.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<T> ResourceClient<T>
where
    T: Identified + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(dispatcher: Dispatcher, name: &str, endpoints: Endpoints) -> Self {
        Self::with_store(dispatcher, endpoints, shared_resource(name))
    }

    pub fn with_store(dispatcher: Dispatcher, endpoints: Endpoints, store: SharedResource<T>) -> Self {
        Self {
            dispatcher,
            endpoints,
            store,
        }
    }

    pub fn store(&self) -> SharedResource<T> {
        Arc::clone(&self.store)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub async fn state(&self) -> Resource<T> {
        self.store.read().await.clone()
    }

    pub async fn fetch(&self) -> Result<Vec<T>, ApiError> {
        self.fetch_with(Vec::new()).await
    }

    pub async fn fetch_with(&self, query: Vec<(String, String)>) -> Result<Vec<T>, ApiError> {
        let mut intent = Intent::get(self.endpoints.list.clone());
        intent.query = query;
        self.run(MutationKind::Fetch, intent, |store, ticket, payload| {
            let items: Vec<T> = list_from(&payload)?;
            store.fetched(ticket, items.clone(), payload.message);
            Ok(items)
        })
        .await
    }

    pub async fn fetch_one(&self, id: &str) -> Result<T, ApiError> {
        let intent = Intent::get(Endpoints::path(&self.endpoints.detail, id));
        self.run(MutationKind::Fetch, intent, |store, ticket, payload| {
            let item: T = payload.data_as()?;
            store.fetched_one(ticket, item.clone(), payload.message);
            Ok(item)
        })
        .await
    }

    pub async fn create(&self, body: Body) -> Result<T, ApiError> {
        let intent = Intent::post(self.endpoints.create.clone()).with_body(body);
        self.run(MutationKind::Create, intent, |store, ticket, payload| {
            let item: T = payload.data_as()?;
            store.created(ticket, item.clone(), payload.message);
            Ok(item)
        })
        .await
    }

    pub async fn update(&self, id: &str, body: Body) -> Result<T, ApiError> {
        let intent = Intent::new(
            self.endpoints.update_method.clone(),
            Endpoints::path(&self.endpoints.update, id),
        )
        .with_body(body);
        self.run(MutationKind::Update, intent, |store, ticket, payload| {
            let item: T = payload.data_as()?;
            store.updated(ticket, item.clone(), payload.message);
            Ok(item)
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let intent = Intent::delete(Endpoints::path(&self.endpoints.delete, id));
        let id = id.to_owned();
        self.run(MutationKind::Delete, intent, move |store, ticket, payload| {
            store.deleted(ticket, &id, payload.message);
            Ok(())
        })
        .await
    }

    pub async fn select(&self, id: Option<&str>) {
        self.store.write().await.select(id);
    }

    pub async fn clear_error(&self, kind: MutationKind) {
        self.store.write().await.clear_error(kind);
    }

    pub async fn clear_message(&self, kind: MutationKind) {
        self.store.write().await.clear_message(kind);
    }

    pub async fn reset(&self) {
        self.store.write().await.reset();
    }

    /// Drive one request through `kind`'s slot. `apply` runs under the
    /// write lock; an error from it rejects the slot like a failed call.
    /// Staleness is judged per endpoint, see [`Intent::lane`].
    pub async fn run<R, F>(&self, kind: MutationKind, intent: Intent, apply: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut Resource<T>, Ticket, Payload) -> Result<R, ApiError>,
    {
        let ticket = self.store.write().await.begin_lane(kind, intent.lane());
        let outcome = self.dispatcher.dispatch(intent).await;

        let mut store = self.store.write().await;
        debug!(resource = %store.name(), kind = ?kind, seq = ticket.seq(), "request settled");
        let result = outcome.and_then(|payload| apply(&mut *store, ticket, payload));
        if let Err(err) = &result {
            warn!(resource = %store.name(), kind = ?kind, error = %err, "request rejected");
            store.rejected(ticket, err.clone());
        }
        result
    }
}

/// Lists arrive as a bare array or wrapped in a paginator object.
pub fn list_from<T: DeserializeOwned>(payload: &Payload) -> Result<Vec<T>, ApiError> {
    let data = match &payload.data {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => ["items", "data", "results"]
            .iter()
            .find_map(|key| map.get(*key).filter(|v| v.is_array()))
            .unwrap_or(&payload.data),
        other => other,
    };
    serde_json::from_value(data.clone()).map_err(|e| ApiError::Decode(e.to_string()))
}
