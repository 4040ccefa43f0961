//! Application configuration.
//!
//! Values come from `config.json` at the standard location, then the
//! environment overrides them. Only presence is checked, by [`AppConfig::validate`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use lenscap_media_model::{CameraPresets, FacingMode, OutputFormat};

use crate::error::{LenscapError, LenscapResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// AR SDK credentials and the lens to apply.
    pub credentials: Credentials,

    /// Camera acquisition settings.
    pub camera: CameraConfig,

    /// Recording output settings.
    pub recording: RecordingDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Token and content identifiers for the AR SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub api_token: Option<String>,
    pub lens_id: Option<String>,
    pub group_id: Option<String>,
}

/// Camera presets and switching policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub presets: CameraPresets,
    pub policy: CameraPolicy,
    /// Frame rate of the stream captured from the render target.
    pub capture_fps: u32,
    /// When set, the render target covers the viewport at this aspect
    /// ratio (width / height); otherwise it matches the viewport.
    pub aspect_ratio: Option<f64>,
}

/// Per-deployment camera behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPolicy {
    /// Overrides the device-class default when set.
    pub default_facing: Option<FacingMode>,
    pub switch_enabled: bool,
    /// Mirror the front camera horizontally.
    pub mirror_front: bool,
    pub switch_strategy: SwitchStrategy,
}

/// Order of acquiring the new camera and releasing the old one during a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SwitchStrategy {
    /// Keep the old camera running until the new one is live.
    #[default]
    AcquireBeforeRelease,
    /// Stop the old camera first, for devices that cannot open two at once.
    ReleaseBeforeAcquire,
}

/// Default recording parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingDefaults {
    pub output: OutputFormat,

    /// Hard ceiling on a single recording, in seconds.
    pub max_duration_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "lenscap=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            presets: CameraPresets::default(),
            policy: CameraPolicy::default(),
            capture_fps: 30,
            aspect_ratio: None,
        }
    }
}

impl Default for CameraPolicy {
    fn default() -> Self {
        Self {
            default_facing: None,
            switch_enabled: true,
            mirror_front: true,
            switch_strategy: SwitchStrategy::default(),
        }
    }
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            output: OutputFormat::default(),
            max_duration_secs: 60,
        }
    }
}

impl RecordingDefaults {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults,
    /// then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_from(&config_file_path());
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load config from `path` without consulting the environment.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Override values from an environment-like lookup. Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("API_TOKEN") {
            self.credentials.api_token = Some(token);
        }
        if let Some(lens) = get("LENS_ID") {
            self.credentials.lens_id = Some(lens);
        }
        if let Some(group) = get("GROUP_ID") {
            self.credentials.group_id = Some(group);
        }
        if let Some(file_name) = get("LENSCAP_OUTPUT_FILE") {
            self.recording.output.file_name = file_name;
        }
        if let Some(mime) = get("LENSCAP_MIME_TYPE") {
            self.recording.output.mime_type = mime;
        }
        if let Some(secs) = get("LENSCAP_MAX_DURATION_SECS") {
            match secs.trim().parse() {
                Ok(secs) => self.recording.max_duration_secs = secs,
                Err(e) => tracing::warn!(value = %secs, "Ignoring invalid max duration: {e}"),
            }
        }
    }

    /// Fail fast on the first missing required value.
    pub fn validate(&self) -> LenscapResult<()> {
        fn present(value: Option<&str>) -> bool {
            value.is_some_and(|v| !v.trim().is_empty())
        }

        let checks = [
            ("API_TOKEN", present(self.credentials.api_token.as_deref())),
            ("LENS_ID", present(self.credentials.lens_id.as_deref())),
            ("GROUP_ID", present(self.credentials.group_id.as_deref())),
            (
                "recording.output.file_name",
                present(Some(self.recording.output.file_name.as_str())),
            ),
            (
                "recording.output.mime_type",
                present(Some(self.recording.output.mime_type.as_str())),
            ),
            (
                "recording.max_duration_secs",
                self.recording.max_duration_secs > 0,
            ),
        ];

        match checks.iter().find(|(_, ok)| !ok) {
            Some((key, _)) => Err(LenscapError::configuration_missing(*key)),
            None => Ok(()),
        }
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("lenscap").join("config.json")
}
