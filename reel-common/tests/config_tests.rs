//! Configuration and graceful degradation tests
//!
//! Uses the serial_test crate because several tests manipulate
//! REEL_ROOT_FOLDER / REEL_ROOT and must not run in parallel.

use reel_common::config::{
    load_toml_config, CompiledDefaults, LoggingConfig, RootFolderInitializer, RootFolderResolver,
};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
struct ModuleToml {
    #[serde(default)]
    root_folder: Option<PathBuf>,
    #[serde(default)]
    logging: LoggingConfig,
}

fn clear_root_env() {
    env::remove_var("REEL_ROOT_FOLDER");
    env::remove_var("REEL_ROOT");
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.log_file.is_none());
    assert!(defaults.root_folder.to_string_lossy().contains("reel"));
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    clear_root_env();

    let root_folder = RootFolderResolver::new("test-module").resolve();

    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(root_folder, defaults.root_folder);
}

#[test]
#[serial]
fn test_resolver_env_var_root_folder() {
    clear_root_env();
    env::set_var("REEL_ROOT_FOLDER", "/tmp/reel-test-env-folder");

    let root_folder = RootFolderResolver::new("test-module").resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/reel-test-env-folder"));

    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_root_folder_takes_precedence_over_root() {
    clear_root_env();
    env::set_var("REEL_ROOT_FOLDER", "/tmp/reel-priority-1");
    env::set_var("REEL_ROOT", "/tmp/reel-priority-2");

    let root_folder = RootFolderResolver::new("test-module").resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/reel-priority-1"));

    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    clear_root_env();
    env::set_var("REEL_ROOT", "/tmp/reel-from-env");

    let root_folder = RootFolderResolver::new("test-module")
        .with_toml_root(Some(PathBuf::from("/tmp/reel-from-toml")))
        .resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/reel-from-env"));

    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_toml_used_when_env_absent() {
    clear_root_env();

    let root_folder = RootFolderResolver::new("test-module")
        .with_toml_root(Some(PathBuf::from("/tmp/reel-from-toml")))
        .resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/reel-from-toml"));
}

#[test]
fn test_initializer_creates_layout() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("nested").join("root");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.output_dir().is_dir());
    assert!(initializer.work_dir().is_dir());
}

#[test]
fn test_initializer_idempotent_directory_creation() {
    let temp = tempfile::tempdir().unwrap();
    let initializer = RootFolderInitializer::new(temp.path().join("root"));

    assert!(initializer.ensure_directory_exists().is_ok());
    assert!(initializer.ensure_directory_exists().is_ok());
    assert!(initializer.root_folder().exists());
}

#[test]
fn test_load_toml_config_reads_values() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("reel-gen.toml");
    std::fs::write(
        &path,
        r#"
        root_folder = "/srv/reel"
        [logging]
        level = "debug"
    "#,
    )
    .unwrap();

    let config: ModuleToml = load_toml_config(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/reel")));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_load_toml_config_missing_logging_uses_default() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("reel-gen.toml");
    std::fs::write(&path, "root_folder = \"/srv/reel\"\n").unwrap();

    let config: ModuleToml = load_toml_config(&path).unwrap();
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_load_toml_config_malformed_is_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("broken.toml");
    std::fs::write(&path, "root_folder = [unterminated").unwrap();

    let result: reel_common::Result<ModuleToml> = load_toml_config(&path);
    assert!(matches!(result, Err(reel_common::Error::Config(_))));
}
