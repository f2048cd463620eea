use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{id_string, opt_id_string};
use crate::client::{Endpoints, ResourceClient};
use crate::dispatcher::{Body, Dispatcher, Intent};
use crate::domains::cart::Cart;
use crate::error::ApiError;
use crate::resource::{Identified, Resource};
use crate::status::MutationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Online,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub address_id: String,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub total: f64,
    /// Assigned by the server; never filled in locally.
    #[serde(default, deserialize_with = "opt_id_string")]
    pub delivery_agent_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Identified for Order {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerRating {
    pub farmer_id: String,
    /// 0 means not rated.
    pub stars: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// At least one farmer must be rated, and every rating is 1 to 5 stars.
pub fn validate_ratings(ratings: &[FarmerRating]) -> Result<Vec<FarmerRating>, ApiError> {
    if ratings.iter().any(|r| r.stars > 5) {
        return Err(ApiError::InvalidInput("Ratings go from 1 to 5 stars.".to_owned()));
    }
    let rated: Vec<FarmerRating> = ratings.iter().filter(|r| r.stars > 0).cloned().collect();
    if rated.is_empty() {
        return Err(ApiError::InvalidInput("Please rate at least one farmer.".to_owned()));
    }
    Ok(rated)
}

#[derive(Clone)]
pub struct Orders {
    client: ResourceClient<Order>,
}

impl Orders {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let endpoints = Endpoints {
            create: "checkout".to_owned(),
            ..Endpoints::rest("orders")
        };
        Self {
            client: ResourceClient::new(dispatcher, "orders", endpoints),
        }
    }

    pub fn client(&self) -> &ResourceClient<Order> {
        &self.client
    }

    pub async fn state(&self) -> Resource<Order> {
        self.client.state().await
    }

    pub async fn fetch(&self) -> Result<Vec<Order>, ApiError> {
        self.client.fetch().await
    }

    pub async fn open(&self, id: &str) -> Result<Order, ApiError> {
        self.client.fetch_one(id).await
    }

    /// Place the order for the current cart; the cart is cleared locally
    /// once the server accepts it.
    pub async fn checkout(&self, cart: &Cart, request: &CheckoutRequest) -> Result<Order, ApiError> {
        if cart.state().await.is_empty() {
            return Err(ApiError::InvalidInput("Your cart is empty.".to_owned()));
        }
        let body = serde_json::to_value(request).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        let order = self.client.create(Body::Json(body)).await?;
        cart.clear().await;
        Ok(order)
    }

    pub async fn rate(&self, order_id: &str, ratings: &[FarmerRating]) -> Result<(), ApiError> {
        let rated = validate_ratings(ratings)?;
        let intent = Intent::post(format!("orders/{order_id}/ratings")).json(json!({ "ratings": rated }));
        self.client
            .run(MutationKind::Update, intent, |store, ticket, payload| {
                store.settled(ticket, payload.message);
                Ok(())
            })
            .await
    }
}
