// core/tests/test_config.rs
use std::collections::HashMap;
use std::path::PathBuf;

use fitbridge_core::config::DEFAULT_CONFIG_PATH;
use fitbridge_core::records::{RecordingMethod, DEFAULT_DATA_ORIGIN};
use fitbridge_core::{
    load_config, save_config, Availability, Config, ConfigError, HealthStore, StoreConfig,
};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn missing_file_gives_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = load_config(tmp.path().join(DEFAULT_CONFIG_PATH)).unwrap();
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.data_origin, DEFAULT_DATA_ORIGIN);
    assert_eq!(
        cfg.store,
        StoreConfig::Dir {
            path: PathBuf::from("health-store")
        }
    );
}

#[test]
fn partial_file_fills_in_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cfg.json");
    std::fs::write(
        &path,
        r#"{ "store": { "kind": "http", "base_url": "https://health.example.org" } }"#,
    )
    .unwrap();

    let cfg = load_config(&path).unwrap();
    assert_eq!(cfg.data_origin, DEFAULT_DATA_ORIGIN);
    assert_eq!(
        cfg.store,
        StoreConfig::Http {
            base_url: "https://health.example.org".into(),
            token: None,
            timeout_secs: 10,
        }
    );
}

#[test]
fn parse_error_names_the_field() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cfg.json");
    std::fs::write(&path, r#"{ "data_origin": 42 }"#).unwrap();

    match load_config(&path).unwrap_err() {
        ConfigError::Parse { path, message } => {
            assert_eq!(path, "data_origin");
            assert!(message.contains("invalid type"), "{message}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn invalid_values_load_and_fail_validation() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cfg.json");
    std::fs::write(
        &path,
        r#"{ "store": { "kind": "http", "base_url": "ftp://nope", "timeout_secs": 5 } }"#,
    )
    .unwrap();

    // overstyringer kan fortsatt rette den, så lasting alene avviser ikke
    let mut cfg = load_config(&path).unwrap();
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

    cfg.apply_env_from(env(&[("FITBRIDGE_STORE_DIR", "/tmp/store")]));
    assert!(cfg.validate().is_ok());
}

#[test]
fn validate_rules() {
    let mut cfg = Config::default();
    assert!(cfg.validate().is_ok());

    cfg.data_origin = "   ".into();
    assert!(cfg.validate().is_err());

    cfg.data_origin = "org.example".into();
    cfg.store = StoreConfig::Http {
        base_url: "http://localhost:8080".into(),
        token: None,
        timeout_secs: 0,
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn env_overrides() {
    let mut cfg = Config::default();
    cfg.apply_env_from(env(&[
        ("FITBRIDGE_DATA_ORIGIN", "org.example.watch"),
        ("FITBRIDGE_STORE_DIR", "/tmp/store"),
    ]));
    assert_eq!(cfg.data_origin, "org.example.watch");
    assert_eq!(cfg.store, StoreConfig::Dir { path: "/tmp/store".into() });

    let meta = cfg.metadata();
    assert_eq!(meta.data_origin, "org.example.watch");
    assert_eq!(meta.recording_method, RecordingMethod::ActivelyRecorded);
}

#[test]
fn env_url_wins_over_dir_and_takes_token() {
    let mut cfg = Config::default();
    cfg.apply_env_from(env(&[
        ("FITBRIDGE_STORE_DIR", "/tmp/store"),
        ("FITBRIDGE_STORE_URL", "https://health.example.org/"),
        ("FITBRIDGE_STORE_TOKEN", "s3cret"),
    ]));
    assert_eq!(
        cfg.store,
        StoreConfig::Http {
            base_url: "https://health.example.org/".into(),
            token: Some("s3cret".into()),
            timeout_secs: 10,
        }
    );
}

#[test]
fn token_without_http_store_is_ignored() {
    let mut cfg = Config::default();
    cfg.apply_env_from(env(&[("FITBRIDGE_STORE_TOKEN", "s3cret")]));
    assert_eq!(cfg.store, StoreConfig::default());
}

#[test]
fn save_then_load() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("fitbridge.json");
    let cfg = Config {
        data_origin: "org.example".into(),
        store: StoreConfig::Memory,
        log_level: Some("debug".into()),
    };
    save_config(&cfg, &path).unwrap();
    assert_eq!(load_config(&path).unwrap(), cfg);
}

#[test]
fn opened_store_matches_kind() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = StoreConfig::Dir {
        path: tmp.path().to_path_buf(),
    };
    assert_eq!(dir.open().availability(), Availability::Available);
    assert_eq!(StoreConfig::Memory.open().availability(), Availability::Available);
}

#[test]
fn env_url_keeps_token_and_timeout_from_file() {
    let mut cfg = Config {
        store: StoreConfig::Http {
            base_url: "https://a.example".into(),
            token: Some("from-file".into()),
            timeout_secs: 30,
        },
        ..Config::default()
    };
    cfg.apply_env_from(env(&[("FITBRIDGE_STORE_URL", "https://b.example")]));
    assert_eq!(
        cfg.store,
        StoreConfig::Http {
            base_url: "https://b.example".into(),
            token: Some("from-file".into()),
            timeout_secs: 30,
        }
    );
}
