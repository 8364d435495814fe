//! Configuration loading and root folder resolution
//!
//! Configuration is layered. Each value is taken from the first source that
//! provides it:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "IVR_ROOT_FOLDER";

/// Compiled-in defaults used when no other source provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub bind_address: String,
    pub port: u16,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            // ~/.local/share/ivr (or /var/lib/ivr for system-wide)
            dirs::data_local_dir()
                .map(|d| d.join("ivr"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/ivr"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("ivr"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ivr"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("ivr"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ivr"))
        } else {
            PathBuf::from("./ivr_data")
        };

        Self {
            root_folder,
            log_level: "info".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 5730,
        }
    }
}

/// Logging section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset (e.g. "info", "ivr_compiler=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// HTTP listener section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Text-to-speech provider section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TtsConfig {
    /// Provider API key (environment variables take precedence)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Voice used for every node of a build
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Provider output format identifier, e.g. "mp3_44100_128"
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Client-side request ceiling against the provider
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl TtsConfig {
    /// File extension for artifacts produced with `output_format`
    ///
    /// The provider encodes the container as the first `_`-separated segment
    /// ("mp3_44100_128" → "mp3", "pcm_16000" → "pcm").
    pub fn audio_extension(&self) -> &str {
        self.output_format
            .split('_')
            .next()
            .filter(|ext| !ext.is_empty())
            .unwrap_or("mp3")
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: None,
            model_id: default_model_id(),
            output_format: default_output_format(),
            requests_per_second: default_requests_per_second(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

/// Audio compiler section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompilerConfig {
    /// Upper bound on in-flight synthesis calls within one build
    #[serde(default = "default_max_concurrent_syntheses")]
    pub max_concurrent_syntheses: usize,
    /// Cadence of progress snapshots on the SSE progress stream
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_syntheses: default_max_concurrent_syntheses(),
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

/// Contents of `<config_dir>/ivr/<module>.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_output_format() -> String {
    "mp3_44100_128".to_string()
}

fn default_requests_per_second() -> u32 {
    2
}

fn default_request_timeout_seconds() -> u64 {
    60
}

fn default_max_concurrent_syntheses() -> usize {
    4
}

fn default_progress_interval_ms() -> u64 {
    300
}

/// Default TOML config location for a module (`~/.config/ivr/<module>.toml`)
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ivr").join(format!("{}.toml", module_name)))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the module config, degrading to defaults when the file is missing or invalid
///
/// A missing or unreadable config file never stops startup: a warning is
/// logged and compiled defaults are used instead.
pub fn load_or_default(explicit_path: Option<&Path>, module_name: &str) -> TomlConfig {
    let path = match explicit_path
        .map(Path::to_path_buf)
        .or_else(|| default_config_path(module_name))
    {
        Some(path) => path,
        None => {
            warn!("Could not determine config directory, using defaults");
            return TomlConfig::default();
        }
    };

    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            TomlConfig::default()
        }
    }
}

/// Root folder resolution: CLI → ENV → TOML → compiled default
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Command-line override
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// `root_folder` from the TOML config
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!(module = %self.module_name, "Root folder from command line: {}", path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!(module = %self.module_name, "Root folder from {}: {}", ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            info!(module = %self.module_name, "Root folder from TOML config: {}", path.display());
            return path.clone();
        }

        let path = CompiledDefaults::for_current_platform().root_folder;
        info!(module = %self.module_name, "Root folder from compiled default: {}", path.display());
        path
    }
}

/// Creates the root folder layout and names the paths inside it
///
/// ```text
/// <root>/ivr.db                     build history
/// <root>/audio/<build_id>/*.mp3     compiled prompts
/// <root>/builds/<build_id>.json     finalized trees
/// ```
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [self.root_folder.clone(), self.audio_dir(), self.builds_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("ivr.db")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root_folder.join("audio")
    }

    pub fn builds_dir(&self) -> PathBuf {
        self.root_folder.join("builds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_extension_from_output_format() {
        let mut tts = TtsConfig::default();
        assert_eq!(tts.audio_extension(), "mp3");

        tts.output_format = "pcm_16000".to_string();
        assert_eq!(tts.audio_extension(), "pcm");

        tts.output_format = "".to_string();
        assert_eq!(tts.audio_extension(), "mp3");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [tts]
            voice_id = "voice-123"
            "#,
        )
        .unwrap();

        assert_eq!(config.tts.voice_id.as_deref(), Some("voice-123"));
        assert_eq!(config.tts.model_id, "eleven_multilingual_v2");
        assert_eq!(config.compiler.max_concurrent_syntheses, 4);
        assert_eq!(config.server.port, 5730);
        assert_eq!(config.logging.level, "info");
    }
}
