use agri_core::{ApiConfig, ClientConfig};

#[test]
fn config_round_trips_and_fills_missing_sections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut config = ClientConfig::default();
    config.api.base_url = "https://market.example.com/api".into();
    config.save_to(&path).unwrap();
    assert_eq!(ClientConfig::load_from(&path).unwrap(), config);

    std::fs::write(&path, r#"{ "api": { "base_url": "https://x.example/v1" } }"#).unwrap();
    let partial = ClientConfig::load_from(&path).unwrap();
    assert_eq!(partial.api.base_url, "https://x.example/v1");
    assert_eq!(partial.api.request_timeout_seconds, ApiConfig::default().request_timeout_seconds);
    assert_eq!(partial.refresh, ClientConfig::default().refresh);
}

#[test]
fn base_url_always_ends_with_slash() {
    let config = ApiConfig {
        base_url: "https://market.example.com/api".into(),
        ..ApiConfig::default()
    };
    let base = config.base().unwrap();
    assert_eq!(base.as_str(), "https://market.example.com/api/");
    assert_eq!(base.join("cart").unwrap().path(), "/api/cart");

    let bad = ApiConfig {
        base_url: "not a url".into(),
        ..ApiConfig::default()
    };
    assert!(bad.base().is_err());
}
