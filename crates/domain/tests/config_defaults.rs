use gd_domain::config::{BackendKind, Config, LogFormat};

#[test]
fn default_timeouts_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.lifecycle.idle_timeout_secs, 15 * 60);
    assert_eq!(config.lifecycle.renewal_timeout_secs, 60);
    assert_eq!(config.lifecycle.lifetime_secs, 2 * 60 * 60);
}

#[test]
fn default_cookie_is_namespaced_and_secure() {
    let config = Config::default();
    assert_eq!(config.lifecycle.cookie_name, "session_{namespace}");
    assert!(config.lifecycle.cookie_secure);
}

#[test]
fn default_backend_is_memory() {
    let config = Config::default();
    assert_eq!(config.store.backend, BackendKind::Memory);
    assert_eq!(config.store.op_timeout_ms, 5_000);
}

#[test]
fn partial_lifecycle_section_keeps_other_defaults() {
    let toml_str = r#"
[lifecycle]
idle_timeout_secs = 2
renewal_timeout_secs = 1
lifetime_secs = 5
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.lifecycle.idle_timeout_secs, 2);
    assert_eq!(config.lifecycle.renewal_timeout_secs, 1);
    assert_eq!(config.lifecycle.lifetime_secs, 5);
    assert_eq!(config.lifecycle.cookie_name, "session_{namespace}");
    assert_eq!(config.store.backend, BackendKind::Memory);
}

#[test]
fn file_backend_parses() {
    let toml_str = r#"
[store]
backend = "file"
path = "/var/lib/guardian"
op_timeout_ms = 250

[observability]
log_format = "json"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.store.backend, BackendKind::File);
    assert_eq!(config.store.path, "/var/lib/guardian");
    assert_eq!(config.store.op_timeout_ms, 250);
    assert_eq!(config.observability.log_format, LogFormat::Json);
    assert!(config.is_valid());
}

#[test]
fn unknown_backend_is_rejected() {
    let toml_str = r#"
[store]
backend = "redis"
"#;
    assert!(toml::from_str::<Config>(toml_str).is_err());
}
