use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Method, Response};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::envelope::Payload;
use crate::error::{ApiError, ConfigError};
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Multipart(Vec<FormField>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormField::Text {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One outbound HTTP call, described independently of the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl Intent {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub fn multipart(mut self, fields: Vec<FormField>) -> Self {
        self.body = Body::Multipart(fields);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Method and path identify an endpoint. Query and body do not, so
    /// page 2 of a list supersedes page 1 while a detail fetch does not.
    pub fn lane(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.method.as_str().hash(&mut hasher);
        self.path.trim_start_matches('/').hash(&mut hasher);
        hasher.finish()
    }
}

/// Result of a primary call followed by a best-effort secondary lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Chained {
    pub primary: Payload,
    pub secondary: Result<Payload, ApiError>,
}

/// Turns intents into HTTP calls against the configured API.
///
/// Attaches `Authorization: Bearer` when a token is stored and normalises
/// every failure into an [`ApiError`]. It never retries and never touches
/// resource state.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    base: Url,
    tokens: KeyValueStore,
}

impl Dispatcher {
    pub fn new(client: Client, base: Url, tokens: KeyValueStore) -> Self {
        Self {
            client,
            base,
            tokens,
        }
    }

    pub fn from_config(config: &ApiConfig, tokens: KeyValueStore) -> Result<Self, ConfigError> {
        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::new(client, config.base()?, tokens))
    }

    pub fn tokens(&self) -> &KeyValueStore {
        &self.tokens
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub async fn dispatch(&self, intent: Intent) -> Result<Payload, ApiError> {
        let response = self.send(&intent).await?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            warn!(path = %intent.path, error = %e, "failed to read response body");
            ApiError::from_transport(&e)
        })?;
        let body: Option<Value> = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice(&bytes).ok()
        };

        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), body.as_ref());
            debug!(path = %intent.path, status = status.as_u16(), error = %err, "request rejected");
            return Err(err);
        }

        let payload = match body {
            Some(body) => Payload::from_body(body),
            None if bytes.is_empty() => Payload::empty(),
            None => {
                warn!(path = %intent.path, status = status.as_u16(), "response body is not JSON");
                return Err(ApiError::Decode("response body is not JSON".to_owned()));
            }
        };
        if !payload.success {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: payload
                    .message
                    .unwrap_or_else(|| "Request was not successful".to_owned()),
            });
        }
        Ok(payload)
    }

    /// Binary download (report exports). Errors are still read as JSON.
    pub async fn download(&self, intent: Intent) -> Result<Vec<u8>, ApiError> {
        let response = self.send(&intent).await?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| ApiError::from_transport(&e))?;
        if status.is_success() {
            Ok(bytes.to_vec())
        } else {
            let body: Option<Value> = serde_json::from_slice(&bytes).ok();
            Err(ApiError::from_response(status.as_u16(), body.as_ref()))
        }
    }

    /// Issue `primary`; on success issue `secondary` and keep its outcome
    /// alongside. A failed secondary never fails the whole call.
    pub async fn dispatch_chained(
        &self,
        primary: Intent,
        secondary: Intent,
    ) -> Result<Chained, ApiError> {
        let primary = self.dispatch(primary).await?;
        let secondary_path = secondary.path.clone();
        let secondary = self.dispatch(secondary).await;
        if let Err(err) = &secondary {
            warn!(path = %secondary_path, error = %err, "secondary lookup failed");
        }
        Ok(Chained { primary, secondary })
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidInput(format!("invalid request path {path}: {e}")))
    }

    async fn send(&self, intent: &Intent) -> Result<Response, ApiError> {
        let url = self.url_for(&intent.path)?;
        debug!(method = %intent.method, url = %url, "dispatching request");

        let mut request = self.client.request(intent.method.clone(), url);
        if !intent.query.is_empty() {
            request = request.query(&intent.query);
        }
        match self.tokens.token().await {
            Some(token) => request = request.bearer_auth(token),
            None => debug!("no auth token stored; sending unauthenticated"),
        }
        request = match &intent.body {
            Body::Empty => request,
            Body::Json(value) => request.json(value),
            Body::Multipart(fields) => request.multipart(build_form(fields)?),
        };

        request.send().await.map_err(|e| {
            warn!(path = %intent.path, error = %e, "transport failure");
            ApiError::from_transport(&e)
        })
    }
}

fn build_form(fields: &[FormField]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            FormField::Text { name, value } => form.text(name.clone(), value.clone()),
            FormField::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|e| ApiError::InvalidInput(format!("invalid MIME type {mime}: {e}")))?;
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}
