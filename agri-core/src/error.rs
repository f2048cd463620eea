use serde_json::Value;
use thiserror::Error;

pub const AUTH_MESSAGE: &str = "Session expired or access denied. Please log in again.";
pub const SERVER_MESSAGE: &str = "Server error. Please try again later.";
pub const NETWORK_MESSAGE: &str = "Network error. Check your connection and try again.";
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Check your connection and try again.";
pub const VALIDATION_MESSAGE: &str = "The submitted data is invalid.";

/// Failure of a single dispatched intent.
///
/// The `Display` output is the human-readable reason shown to the user; the
/// variant keeps the kind so callers can react to it (re-login on
/// `Unauthorized`, retry affordance on transient errors) without string matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String, fields: Vec<String> },
    #[error("{message}")]
    Unauthorized { status: u16, message: String },
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
    /// Malformed response. Shown like a transport failure; the parser
    /// message is kept for logs.
    #[error("{}", NETWORK_MESSAGE)]
    Decode(String),
    #[error("{0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Map a non-2xx response onto an error.
    ///
    /// Priority: field errors of a 422, then the server `message`, then a
    /// fixed message for the status class.
    pub fn from_response(status: u16, body: Option<&Value>) -> Self {
        let server_message = body
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(ToOwned::to_owned);

        match status {
            422 => {
                let fields = body
                    .and_then(|b| b.get("errors"))
                    .map(collect_field_errors)
                    .unwrap_or_default();
                let message = if fields.is_empty() {
                    server_message.unwrap_or_else(|| VALIDATION_MESSAGE.to_owned())
                } else {
                    fields.join(", ")
                };
                ApiError::Validation { message, fields }
            }
            401 | 403 => ApiError::Unauthorized {
                status,
                message: server_message.unwrap_or_else(|| AUTH_MESSAGE.to_owned()),
            },
            500..=599 => ApiError::Server {
                status,
                message: server_message.unwrap_or_else(|| SERVER_MESSAGE.to_owned()),
            },
            _ => ApiError::Http {
                status,
                message: server_message
                    .unwrap_or_else(|| format!("Request failed with status {status}")),
            },
        }
    }

    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Transport(TIMEOUT_MESSAGE.to_owned())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(NETWORK_MESSAGE.to_owned())
        }
    }

    /// Network, malformed-response and 5xx failures; the UI offers a
    /// retry for these.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(_) | ApiError::Decode(_) | ApiError::Server { .. }
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Validation { .. } => Some(422),
            ApiError::Unauthorized { status, .. }
            | ApiError::Server { status, .. }
            | ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// `errors` comes as `{field: [msg, ..]}`, `[msg, ..]` or a bare string.
fn collect_field_errors(errors: &Value) -> Vec<String> {
    let mut out = Vec::new();
    match errors {
        Value::Object(map) => {
            for value in map.values() {
                out.extend(collect_field_errors(value));
            }
        }
        Value::Array(items) => {
            for item in items {
                out.extend(collect_field_errors(item));
            }
        }
        Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_owned()),
        _ => {}
    }
    out
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
