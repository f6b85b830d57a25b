// CONFIG TESTS
// ============

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use ecofloc::core::config::{Config, CpuProfile};
use ecofloc::core::energy::MemoryPublisher;
use ecofloc::MonitoringContext;

#[test]
fn test_save_then_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.interval_ms = 250;
    config.cpu = Some(CpuProfile {
        tdp: 95.0,
        clock_speed: 3.8e9,
        voltage: 1.25,
    });
    config.storage.evict_stale_counters = true;
    config.shared_memory.enabled = false;
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.interval_ms, 250);
    assert_eq!(loaded.cpu, config.cpu);
    assert!(loaded.storage.evict_stale_counters);
    assert!(!loaded.shared_memory.enabled);
    assert_eq!(loaded.shared_memory.name, config.shared_memory.name);
}

#[test]
fn test_saved_file_uses_camel_case_profile_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let mut config = Config::default();
    config.cpu = Some(CpuProfile {
        tdp: 65.0,
        clock_speed: 3.5e9,
        voltage: 1.2,
    });
    config.save_to(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"clockSpeed\""));
    assert!(!text.contains("clock_speed"));
}

#[test]
fn test_zero_interval_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"interval_ms": 0}"#).unwrap();

    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_empty_and_partial_files_use_defaults() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty.json");
    fs::write(&empty, "   \n").unwrap();
    assert_eq!(Config::load_from(&empty).unwrap().interval_ms, 500);

    let partial = dir.path().join("partial.json");
    fs::write(&partial, r#"{"storage": {"evict_stale_counters": true}}"#).unwrap();
    let config = Config::load_from(&partial).unwrap();
    assert_eq!(config.interval_ms, 500);
    assert!(config.storage.evict_stale_counters);
    assert!(config.shared_memory.enabled);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_loaded_interval_builds_context() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"interval_ms": 1000}"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    let ctx = MonitoringContext::new(Arc::new(MemoryPublisher::new()), config.interval_ms).unwrap();
    assert_eq!(ctx.interval_ms(), 1000);
}
