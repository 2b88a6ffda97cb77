//! Configuration loading tests
//!
//! Tests that the reader configuration is created with the expected
//! defaults and that changes survive a save/load cycle

use msgreader::config::{AlertTarget, Backend, Config, DEFAULT_GRACE_DELAY_MS};
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_missing_config_is_created_with_defaults() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("msgreader.cfg");

    let config = Config::load_from(&path).expect("Failed to load config");
    assert!(path.exists());
    assert_eq!(config.path(), &path);

    assert!(config.enabled());
    assert!(config.require_output_device());
    assert!(!config.announce_sender_only());
    assert_eq!(config.language(), "en");
    assert_eq!(config.backend(), Backend::Auto);
    assert_eq!(config.alert_target(), AlertTarget::Desktop);
    assert_eq!(config.grace_delay(), Duration::from_millis(DEFAULT_GRACE_DELAY_MS));
    assert_eq!(config.init_timeout(), None);
    assert!(config.contacts.is_empty());
}

#[test]
fn test_changes_survive_save() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("msgreader.cfg");

    let mut config = Config::load_from(&path).expect("Failed to load config");
    config.set("reader", "language", "pt-BR");
    config.set("reader", "require_output_device", "false");
    config.set("engine", "backend", "espeak");
    config.set("engine", "init_timeout_ms", "2500");
    config.set("contacts", "+15551234", "Alice");
    config.save().expect("Failed to save config");

    let reloaded = Config::load_from(&path).expect("Failed to reload config");
    let settings = reloaded.settings();
    assert_eq!(settings.language, "pt-BR");
    assert!(!settings.require_output_device);
    assert_eq!(settings.init_timeout, Some(Duration::from_millis(2500)));
    assert_eq!(reloaded.backend(), Backend::Espeak);
    assert_eq!(reloaded.contacts.get("+15551234").map(String::as_str), Some("Alice"));
}

#[test]
fn test_broken_file_is_an_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("msgreader.cfg");
    std::fs::write(&path, "[reader\nenabled = true\n").expect("Failed to write config");

    assert!(Config::load_from(&path).is_err());
}
