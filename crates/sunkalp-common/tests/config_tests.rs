//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Configuration loader integration tests."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::time::Duration;

use sunkalp_common::config::{AppConfig, NotificationPermission};
use sunkalp_common::LogFormat;
use tempfile::tempdir;

#[test]
fn loads_first_existing_candidate() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    let present = dir.path().join("sunkalp.toml");
    fs::write(
        &present,
        r#"
[telemetry]
endpoint = "http://127.0.0.1:8080"
results = 30
poll_interval = 5
request_timeout = 3

[alerts]
overheat_celsius = 45.0
low_battery_percent = 25.0

[notifications]
permission = "granted"
command = ["notify-send", "--app-name=sunkalp"]

[logging]
format = "pretty"
stdout = false
"#,
    )
    .unwrap();

    let loaded = AppConfig::load_with_source(&[&missing, &present]).unwrap();
    assert_eq!(loaded.source.as_deref(), Some(present.as_path()));
    let config = loaded.config;
    assert_eq!(config.telemetry.endpoint.as_str(), "http://127.0.0.1:8080/");
    assert_eq!(config.telemetry.results, 30);
    assert_eq!(config.telemetry.poll_interval, Duration::from_secs(5));
    assert_eq!(config.telemetry.request_timeout, Some(Duration::from_secs(3)));
    assert_eq!(config.alerts.overheat_celsius, 45.0);
    assert_eq!(config.notifications.permission, NotificationPermission::Granted);
    assert_eq!(
        config.notifications.command,
        Some(vec!["notify-send".to_owned(), "--app-name=sunkalp".to_owned()])
    );
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert!(!config.logging.stdout);
}

#[test]
fn falls_back_to_defaults_without_candidates() {
    let dir = tempdir().unwrap();
    let loaded = AppConfig::load_with_source(&[dir.path().join("nope.toml")]).unwrap();
    assert!(loaded.source.is_none());
    assert_eq!(loaded.config.telemetry.results, 15);
}

#[test]
fn invalid_file_is_reported_with_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[telemetry]\nresults = 0\n").unwrap();
    let err = AppConfig::load(&[&path]).expect_err("zero results must fail validation");
    assert!(format!("{err:#}").contains("results"));
}
