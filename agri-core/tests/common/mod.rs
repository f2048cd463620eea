#![allow(dead_code)]

use agri_core::{ApiConfig, Dispatcher, KeyValueStore, TOKEN_KEY};
use wiremock::MockServer;

pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: format!("{}/api", server.uri()),
        request_timeout_seconds: 5,
        ..ApiConfig::default()
    }
}

pub async fn dispatcher(server: &MockServer) -> Dispatcher {
    dispatcher_with_token(server, Some("secret-token")).await
}

pub async fn dispatcher_with_token(server: &MockServer, token: Option<&str>) -> Dispatcher {
    let tokens = KeyValueStore::in_memory();
    if let Some(token) = token {
        tokens.set(TOKEN_KEY, token).await.unwrap();
    }
    Dispatcher::from_config(&api_config(server), tokens).unwrap()
}
