use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{id_string, require};
use crate::client::{Endpoints, ResourceClient};
use crate::dispatcher::{Body, Dispatcher};
use crate::error::ApiError;
use crate::resource::{Identified, Resource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(default)]
    pub farmer_id: Option<String>,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

impl Identified for CartItem {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Clone)]
pub struct Cart {
    client: ResourceClient<CartItem>,
}

impl Cart {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let endpoints = Endpoints {
            list: "cart".to_owned(),
            ..Endpoints::rest("cart/items")
        }
        .with_update_method(Method::PATCH);
        Self {
            client: ResourceClient::new(dispatcher, "cart", endpoints),
        }
    }

    pub fn client(&self) -> &ResourceClient<CartItem> {
        &self.client
    }

    pub async fn state(&self) -> Resource<CartItem> {
        self.client.state().await
    }

    pub async fn fetch(&self) -> Result<Vec<CartItem>, ApiError> {
        self.client.fetch().await
    }

    /// Adding a product already in the cart comes back as the same line
    /// with the new quantity; it moves to the front.
    pub async fn add(&self, product_id: &str, quantity: u32) -> Result<CartItem, ApiError> {
        require("Product", product_id)?;
        if quantity == 0 {
            return Err(ApiError::InvalidInput("Quantity must be at least 1.".to_owned()));
        }
        self.client
            .create(Body::Json(json!({ "product_id": product_id, "quantity": quantity })))
            .await
    }

    /// Zero removes the line.
    pub async fn set_quantity(&self, id: &str, quantity: u32) -> Result<Option<CartItem>, ApiError> {
        if quantity == 0 {
            self.client.delete(id).await?;
            return Ok(None);
        }
        self.client
            .update(id, Body::Json(json!({ "quantity": quantity })))
            .await
            .map(Some)
    }

    pub async fn remove(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(id).await
    }

    pub async fn total(&self) -> f64 {
        let store = self.client.store();
        let store = store.read().await;
        let total: f64 = store.items().iter().map(CartItem::line_total).sum();
        (total * 100.0).round() / 100.0
    }

    /// Local clear after checkout or logout.
    pub async fn clear(&self) {
        self.client.reset().await;
    }
}
