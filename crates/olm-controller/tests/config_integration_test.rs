/// Integration tests for loading controller configuration
///
/// These tests verify that configuration files and environment overrides
/// combine in the documented priority order.

use olm_controller::config::{ConfigSource, ControllerConfig, ResolutionMode};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = ControllerConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, ControllerConfig::default());
}

#[test]
fn test_load_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("controller.toml");
    fs::write(
        &path,
        r#"
[features]
extension-api = false

[resolution]
mode = "global"
max-solver-iterations = 500

[install]
label-prefix = "example.com"
"#,
    )
    .unwrap();

    let config = ControllerConfig::load(&path).unwrap();
    assert!(!config.features.extension_api);
    assert_eq!(config.resolution.mode, ResolutionMode::Global);
    assert_eq!(config.resolution.max_solver_iterations, 500);
    assert!(config.unpack.cache);
    assert_eq!(config.install.label_prefix, "example.com");
    assert_eq!(config.source("resolution.mode"), ConfigSource::File(path.clone()));
    assert_eq!(config.source("unpack.cache"), ConfigSource::Default);
}

#[test]
fn test_environment_wins_over_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("controller.toml");
    fs::write(&path, "[resolution]\nmode = \"global\"\n").unwrap();

    let mut config = ControllerConfig::load(&path).unwrap();
    config
        .apply_env_from(|var| match var {
            "OLM_RESOLUTION_MODE" => Some("single".to_string()),
            "OLM_UNPACK_CACHE" => Some("0".to_string()),
            _ => None,
        })
        .unwrap();

    assert_eq!(config.resolution.mode, ResolutionMode::Single);
    assert!(!config.unpack.cache);
    assert_eq!(
        config.source("resolution.mode"),
        ConfigSource::Environment("OLM_RESOLUTION_MODE".to_string())
    );
}

#[test]
fn test_malformed_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("controller.toml");
    fs::write(&path, "[resolution\nmode = ").unwrap();

    let err = ControllerConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));
}
