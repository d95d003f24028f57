use radio_charts::config::{RadioChartsConfig, DEFAULT_STATIONS};
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = RadioChartsConfig::default();
    assert!(!config.popularity.enabled);
    assert_eq!(config.popularity.fetch_timeout(), Duration::from_secs(10));
    assert_eq!(config.popularity.request_delay(), Duration::from_millis(100));
    assert_eq!(config.popularity.endpoint, "https://api.deezer.com");
    assert!(config.output.archive);
    assert!(!config.output.transfer);
    assert!(config.output.limit.is_none());
    assert_eq!(config.stations.names.len(), DEFAULT_STATIONS.len());
    assert!(config.paths.cache.ends_with("popularity_cache.db"));
    assert!(config.paths.status.is_none());
    assert_eq!(
        config.paths.archive_path(),
        std::path::Path::new("Outputs").join("Archive")
    );
}

#[test]
fn test_get_default_config_paths() {
    let paths = RadioChartsConfig::get_default_config_paths();

    assert!(paths.iter().any(|p| p.ends_with("radio-charts.toml")));
    assert!(paths.iter().any(|p| p.ends_with("config/radio-charts.toml")));
    assert!(paths.len() >= 2);
}

#[test]
fn test_summary_path_defaults_next_to_cache() {
    let config = RadioChartsConfig::default();
    assert!(config.paths.summary_path().ends_with("runs.jsonl"));
}

#[test_log::test]
fn test_load_with_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("radio-charts.toml");
    std::fs::write(
        &path,
        r#"
[paths]
stations = "/data/stations"
output = "/data/out"
status = "/data/status/last_update.json"
archive = "/data/archive"

[popularity]
enabled = true
timeout = 3

[output]
playlist = "Danish_Radio"
archive = false
transfer = true
limit = 50
"#,
    )
    .unwrap();

    let config = RadioChartsConfig::load_with_file(Some(&path)).unwrap();
    assert_eq!(config.paths.stations, "/data/stations");
    assert_eq!(config.paths.output, "/data/out");
    assert_eq!(
        config.paths.status.as_deref(),
        Some("/data/status/last_update.json")
    );
    assert!(config.popularity.enabled);
    assert_eq!(config.popularity.fetch_timeout(), Duration::from_secs(3));
    // Untouched keys keep their defaults
    assert_eq!(config.popularity.request_delay(), Duration::from_millis(100));
    assert_eq!(config.output.playlist, "Danish_Radio");
    assert!(!config.output.archive);
    assert!(config.output.transfer);
    assert_eq!(config.output.limit, Some(50));
    assert_eq!(config.paths.archive_path(), std::path::PathBuf::from("/data/archive"));
}

#[test_log::test]
fn test_missing_explicit_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = RadioChartsConfig::load_with_file(Some(dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config.output.playlist, "Radio_Top");
}
