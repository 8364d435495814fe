//! Configuration loading and root folder resolution
//!
//! Uses serial_test to prevent ENV variable race conditions: tests that set
//! IVR_ROOT_FOLDER are marked #[serial].

use ivr_common::config::{
    load_or_default, load_toml_config, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = RootFolderResolver::new("test-module").resolve();

    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_priority_order() {
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/ivr-from-toml")),
        ..TomlConfig::default()
    };

    // TOML beats compiled default
    env::remove_var(ROOT_FOLDER_ENV);
    let resolver = RootFolderResolver::new("test-module").with_toml(&toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/ivr-from-toml"));

    // ENV beats TOML
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ivr-from-env");
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/ivr-from-env"));

    // CLI beats ENV
    let resolver = resolver.with_cli_arg(Some(PathBuf::from("/tmp/ivr-from-cli")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/ivr-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_missing_config_file_degrades_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_or_default(Some(&dir.path().join("absent.toml")), "ivr-compiler");
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_invalid_config_file_degrades_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "root_folder = [unterminated").unwrap();

    assert!(load_toml_config(&path).is_err());
    assert_eq!(load_or_default(Some(&path), "ivr-compiler"), TomlConfig::default());
}

#[test]
fn test_full_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ivr-compiler.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/ivr"

[logging]
level = "debug"

[server]
bind_address = "0.0.0.0"
port = 8080

[tts]
api_key = "secret"
voice_id = "voice-1"
output_format = "pcm_16000"
requests_per_second = 5

[compiler]
max_concurrent_syntheses = 2
progress_interval_ms = 100
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/ivr")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.tts.api_key.as_deref(), Some("secret"));
    assert_eq!(config.tts.audio_extension(), "pcm");
    assert_eq!(config.tts.requests_per_second, 5);
    assert_eq!(config.compiler.max_concurrent_syntheses, 2);
    assert_eq!(config.compiler.progress_interval_ms, 100);
}

#[test]
fn test_initializer_creates_layout() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.audio_dir().is_dir());
    assert!(initializer.builds_dir().is_dir());
    assert_eq!(initializer.database_path(), root.join("ivr.db"));

    // Idempotent
    initializer.ensure_directory_exists().unwrap();
}
