//! Configuration loading and config file resolution
//!
//! Missing configuration never stops startup: every field has a compiled
//! default and a missing or unreadable file degrades to those defaults with
//! a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "HIREWIRE_CONFIG";

/// Config file resolution following priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform config directory (`<config_dir>/hirewire/config.toml`)
/// 4. None, meaning compiled defaults
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    env_var_name: String,
}

impl ConfigResolver {
    pub fn new(env_var_name: impl Into<String>) -> Self {
        Self {
            env_var_name: env_var_name.into(),
        }
    }

    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        let platform = default_config_path()?;
        if platform.exists() {
            Some(platform)
        } else {
            None
        }
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(CONFIG_ENV_VAR)
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hirewire").join("config.toml"))
}

/// Root of the TOML configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub signaling: SignalingSection,
    pub session: SessionSection,
    pub scoring: ScoringSection,
    pub context: ContextSection,
    pub recorder: RecorderSection,
    pub upload: UploadSection,
    pub logging: LoggingSection,
}

impl TomlConfig {
    /// Parse a config file; errors if the file is missing or malformed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve and load the config, degrading to defaults on any failure
    pub fn load_or_default(resolver: &ConfigResolver, cli_arg: Option<&Path>) -> Self {
        match resolver.resolve(cli_arg) {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to load config {}: {} (using defaults)",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            None => {
                warn!("No config file found, using compiled defaults");
                Self::default()
            }
        }
    }

    /// Reject values that would make the runtime misbehave
    pub fn validate(&self) -> Result<()> {
        if self.recorder.chunk_interval_ms == 0 {
            return Err(Error::Config(
                "recorder.chunk_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.session.stats_interval_secs == 0 {
            return Err(Error::Config(
                "session.stats_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.upload.poll_interval_ms == 0 {
            return Err(Error::Config(
                "upload.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.context.demote_threshold)
            || !(0.0..=1.0).contains(&self.context.escalate_threshold)
            || self.context.demote_threshold >= self.context.escalate_threshold
        {
            return Err(Error::Config(
                "context thresholds must satisfy 0 <= demote < escalate <= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Credential, SDP exchange and session lifecycle endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignalingSection {
    pub token_endpoint: String,
    pub session_start_endpoint: String,
    pub session_end_endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for SignalingSection {
    fn default() -> Self {
        Self {
            token_endpoint: "http://localhost:3000/api/interview/token".to_string(),
            session_start_endpoint: "http://localhost:3000/api/interview/session/start"
                .to_string(),
            session_end_endpoint: "http://localhost:3000/api/interview/session/end".to_string(),
            request_timeout_secs: 15,
        }
    }
}

/// Realtime session timing policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSection {
    pub connect_timeout_secs: u64,
    pub score_grace_secs: u64,
    pub max_ice_restarts: u32,
    pub stats_interval_secs: u64,
    pub channel_open_timeout_ms: u64,
    pub fallback_enabled: bool,
    pub event_bus_capacity: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 8,
            score_grace_secs: 8,
            max_ice_restarts: 3,
            stats_interval_secs: 5,
            channel_open_timeout_ms: 4000,
            fallback_enabled: false,
            event_bus_capacity: 256,
        }
    }
}

/// Coefficients of the local fallback score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringSection {
    pub base: f64,
    pub per_question: f64,
    pub per_tier: f64,
    pub question_cap: u32,
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self {
            base: 50.0,
            per_question: 4.0,
            per_tier: 3.0,
            question_cap: 8,
        }
    }
}

/// Context assembly thresholds and budget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextSection {
    pub max_tokens: usize,
    pub escalate_threshold: f64,
    pub demote_threshold: f64,
    pub coverage_threshold: f64,
    pub required_skills: Vec<String>,
}

impl Default for ContextSection {
    fn default() -> Self {
        Self {
            max_tokens: 800,
            escalate_threshold: 0.7,
            demote_threshold: 0.4,
            coverage_threshold: 0.6,
            required_skills: Vec::new(),
        }
    }
}

/// Composite recorder settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecorderSection {
    pub chunk_interval_ms: u64,
    pub frame_rate: u32,
    pub region_selector: String,
    pub resolution: String,
    pub microphone_gain: f32,
    pub ai_gain: f32,
}

impl Default for RecorderSection {
    fn default() -> Self {
        Self {
            chunk_interval_ms: 5000,
            frame_rate: 30,
            region_selector: "#interview-stage".to_string(),
            resolution: "1280x720".to_string(),
            microphone_gain: 1.0,
            ai_gain: 0.8,
        }
    }
}

/// Progressive upload endpoints and finalize policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadSection {
    pub chunk_endpoint: String,
    pub finalize_endpoint: String,
    pub finalize_wait_secs: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            chunk_endpoint: "http://localhost:3000/api/interview/upload/chunk".to_string(),
            finalize_endpoint: "http://localhost:3000/api/interview/upload/finalize".to_string(),
            finalize_wait_secs: 30,
            poll_interval_ms: 250,
            request_timeout_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
