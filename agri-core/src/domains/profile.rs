use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{form_or_json, id_string, require, Attachment};
use crate::client::{Endpoints, ResourceClient};
use crate::dispatcher::{Body, Dispatcher, Intent};
use crate::error::ApiError;
use crate::resource::{Identified, Resource};
use crate::status::MutationKind;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Farmer,
    #[serde(alias = "delivery_boy")]
    DeliveryAgent,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Identified for Profile {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<Attachment>,
}

impl ProfileUpdate {
    pub fn into_body(self) -> Body {
        form_or_json(
            vec![("name", self.name), ("email", self.email), ("phone", self.phone)],
            self.avatar.map(|a| ("avatar", a)),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl Identified for Address {
    fn id(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressInput {
    pub label: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: Option<String>,
    pub is_default: bool,
}

impl AddressInput {
    fn to_body(&self) -> Result<Body, ApiError> {
        require("Address line", &self.line1)?;
        require("City", &self.city)?;
        serde_json::to_value(self)
            .map(Body::Json)
            .map_err(|e| ApiError::InvalidInput(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirmation: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<(), ApiError> {
        require("Current password", &self.current_password)?;
        if self.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::InvalidInput(format!(
                "New password must be at least {MIN_PASSWORD_LEN} characters."
            )));
        }
        if self.new_password != self.confirmation {
            return Err(ApiError::InvalidInput("Passwords do not match.".to_owned()));
        }
        if self.new_password == self.current_password {
            return Err(ApiError::InvalidInput(
                "New password must differ from the current one.".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Signed-in user's profile, saved addresses and password.
#[derive(Clone)]
pub struct Account {
    profile: ResourceClient<Profile>,
    addresses: ResourceClient<Address>,
}

impl Account {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            profile: ResourceClient::new(dispatcher.clone(), "profile", Endpoints::single("profile")),
            addresses: ResourceClient::new(dispatcher, "addresses", Endpoints::rest("addresses")),
        }
    }

    pub async fn profile_state(&self) -> Resource<Profile> {
        self.profile.state().await
    }

    pub async fn addresses_state(&self) -> Resource<Address> {
        self.addresses.state().await
    }

    pub async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        self.profile.fetch_one("me").await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile, ApiError> {
        if let Some(name) = &update.name {
            require("Name", name)?;
        }
        self.profile.update("me", update.into_body()).await
    }

    pub async fn change_password(&self, change: PasswordChange) -> Result<(), ApiError> {
        change.validate()?;
        let intent = Intent::post("change-password").json(json!({
            "current_password": change.current_password,
            "new_password": change.new_password,
            "new_password_confirmation": change.confirmation,
        }));
        self.profile
            .run(MutationKind::Update, intent, |store, ticket, payload| {
                store.settled(ticket, payload.message);
                Ok(())
            })
            .await
    }

    pub async fn fetch_addresses(&self) -> Result<Vec<Address>, ApiError> {
        self.addresses.fetch().await
    }

    pub async fn add_address(&self, address: &AddressInput) -> Result<Address, ApiError> {
        self.addresses.create(address.to_body()?).await
    }

    pub async fn update_address(&self, id: &str, address: &AddressInput) -> Result<Address, ApiError> {
        self.addresses.update(id, address.to_body()?).await
    }

    pub async fn delete_address(&self, id: &str) -> Result<(), ApiError> {
        self.addresses.delete(id).await
    }

    pub async fn default_address(&self) -> Option<Address> {
        let store = self.addresses.store();
        let store = store.read().await;
        store.items().iter().find(|a| a.is_default).cloned()
    }

    /// Logout.
    pub async fn reset(&self) {
        self.profile.reset().await;
        self.addresses.reset().await;
    }
}
