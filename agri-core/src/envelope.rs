use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Normalised `{ data, message, success }` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub data: Value,
    pub message: Option<String>,
    pub success: bool,
}

impl Payload {
    /// Unwrap the response envelope. Bodies without a `data` key are taken
    /// whole as the payload.
    pub fn from_body(body: Value) -> Self {
        match body {
            Value::Object(mut map) if map.contains_key("data") => {
                let data = map.remove("data").unwrap_or(Value::Null);
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned);
                let success = map.get("success").and_then(Value::as_bool).unwrap_or(true);
                Self {
                    data,
                    message,
                    success,
                }
            }
            Value::Object(map) => {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned);
                let success = map.get("success").and_then(Value::as_bool).unwrap_or(true);
                Self {
                    data: Value::Object(map),
                    message,
                    success,
                }
            }
            other => Self {
                data: other,
                message: None,
                success: true,
            },
        }
    }

    pub fn empty() -> Self {
        Self {
            data: Value::Null,
            message: None,
            success: true,
        }
    }

    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.data.clone()).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        serde_json::from_value(self.data).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
