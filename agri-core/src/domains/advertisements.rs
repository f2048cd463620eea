use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{form_or_json, id_string, require, Attachment};
use crate::client::{Endpoints, ResourceClient};
use crate::dispatcher::{Body, Dispatcher};
use crate::error::ApiError;
use crate::resource::{Identified, Resource};

pub const AD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Farmer-published promotion shown on the storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advertisement {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub title: String,
    pub message: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl Identified for Advertisement {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAdvertisement {
    pub title: String,
    pub message: String,
    pub from: String,
    pub to: String,
    pub image: Option<Attachment>,
}

impl NewAdvertisement {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            from: from.into(),
            to: to.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Attachment) -> Self {
        self.image = Some(image);
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        require("Title", &self.title)?;
        require("Message", &self.message)?;
        let from = parse_time("Start", &self.from)?;
        let to = parse_time("End", &self.to)?;
        if to <= from {
            return Err(ApiError::InvalidInput(
                "End time must be after start time.".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn into_body(self) -> Body {
        form_or_json(
            vec![
                ("title", Some(self.title)),
                ("message", Some(self.message)),
                ("from", Some(self.from)),
                ("to", Some(self.to)),
            ],
            self.image.map(|img| ("image", img)),
        )
    }
}

fn parse_time(label: &str, value: &str) -> Result<NaiveDateTime, ApiError> {
    NaiveDateTime::parse_from_str(value.trim(), AD_TIME_FORMAT).map_err(|_| {
        ApiError::InvalidInput(format!("{label} time must look like 2024-01-31 18:00."))
    })
}

#[derive(Clone)]
pub struct Advertisements {
    client: ResourceClient<Advertisement>,
}

impl Advertisements {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            client: ResourceClient::new(dispatcher, "advertisements", Endpoints::rest("advertisements")),
        }
    }

    pub fn client(&self) -> &ResourceClient<Advertisement> {
        &self.client
    }

    pub async fn state(&self) -> Resource<Advertisement> {
        self.client.state().await
    }

    pub async fn fetch(&self) -> Result<Vec<Advertisement>, ApiError> {
        self.client.fetch().await
    }

    pub async fn create(&self, ad: NewAdvertisement) -> Result<Advertisement, ApiError> {
        ad.validate()?;
        self.client.create(ad.into_body()).await
    }

    pub async fn update(&self, id: &str, ad: NewAdvertisement) -> Result<Advertisement, ApiError> {
        ad.validate()?;
        self.client.update(id, ad.into_body()).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(id).await
    }
}
