pub mod advertisements;
pub mod cart;
pub mod delivery;
pub mod notifications;
pub mod orders;
pub mod profile;
pub mod sales;
pub mod tickets;

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::dispatcher::{Body, FormField};
use crate::error::ApiError;

/// Ids arrive as strings or numbers depending on the endpoint.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

pub(crate) fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// File picked for upload (advertisement image, ticket screenshot, avatar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        let mime = match path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            Some("pdf") => "application/pdf",
            _ => "application/octet-stream",
        };
        Ok(Self::new(file_name, mime, bytes))
    }

    pub fn into_field(self, name: &str) -> FormField {
        FormField::File {
            name: name.to_owned(),
            file_name: self.file_name,
            mime: self.mime,
            bytes: self.bytes,
        }
    }
}

/// JSON for plain fields, multipart as soon as a file is attached.
pub(crate) fn form_or_json(fields: Vec<(&str, Option<String>)>, file: Option<(&str, Attachment)>) -> Body {
    let present = fields.into_iter().filter_map(|(k, v)| v.map(|v| (k, v)));
    match file {
        Some((name, attachment)) => {
            let mut form: Vec<FormField> = present.map(|(k, v)| FormField::text(k, v)).collect();
            form.push(attachment.into_field(name));
            Body::Multipart(form)
        }
        None => {
            let map: Map<String, Value> = present.map(|(k, v)| (k.to_owned(), Value::String(v))).collect();
            Body::Json(Value::Object(map))
        }
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::InvalidInput(format!("{field} is required.")))
    } else {
        Ok(())
    }
}

/// Inclusive day range for reports and history screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ApiError> {
        if from > to {
            return Err(ApiError::InvalidInput(
                "Start date must not be after end date.".to_owned(),
            ));
        }
        Ok(Self { from, to })
    }

    pub fn query(&self) -> Vec<(String, String)> {
        vec![
            ("from".to_owned(), self.from.format("%Y-%m-%d").to_string()),
            ("to".to_owned(), self.to.format("%Y-%m-%d").to_string()),
        ]
    }
}
