//! Runtime configuration for hirewire-rt
//!
//! Turns the TOML bootstrap file (`hirewire_common::config::TomlConfig`) into
//! the typed settings each component takes.
//!
//! # Sources Priority
//!
//! 1. `--config` command-line argument
//! 2. `HIREWIRE_CONFIG` environment variable
//! 3. Platform config directory (`hirewire/config.toml`)
//! 4. Built-in defaults

use std::path::Path;

use hirewire_common::config::{ConfigResolver, ContextSection, TomlConfig, CONFIG_ENV_VAR};

use crate::assembler::{ContextSettings, TrimPolicy};
use crate::recorder::RecorderSettings;
use crate::session::{FallbackScoring, SessionSettings};
use crate::signaling::SignalingSettings;
use crate::upload::UploadSettings;

impl From<&ContextSection> for ContextSettings {
    fn from(section: &ContextSection) -> Self {
        Self {
            escalate_threshold: section.escalate_threshold,
            demote_threshold: section.demote_threshold,
            coverage_threshold: section.coverage_threshold,
            max_tokens: section.max_tokens,
            trim_policy: TrimPolicy::DropOptional,
        }
    }
}

/// Per-component settings derived from one TOML file
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub signaling: SignalingSettings,
    pub session: SessionSettings,
    pub scoring: FallbackScoring,
    pub context: ContextSettings,
    pub required_skills: Vec<String>,
    pub recorder: RecorderSettings,
    pub upload: UploadSettings,
    pub event_bus_capacity: usize,
    pub log_level: String,
}

impl RuntimeConfig {
    pub fn from_toml(toml: &TomlConfig) -> Self {
        Self {
            signaling: SignalingSettings::from(&toml.signaling),
            session: SessionSettings::from(&toml.session),
            scoring: FallbackScoring::from(&toml.scoring),
            context: ContextSettings::from(&toml.context),
            required_skills: toml.context.required_skills.clone(),
            recorder: RecorderSettings::from(&toml.recorder),
            upload: UploadSettings::from(&toml.upload),
            event_bus_capacity: toml.session.event_bus_capacity,
            log_level: toml.logging.level.clone(),
        }
    }

    /// Resolve and load the config file, degrading to defaults
    pub fn load(cli_arg: Option<&Path>) -> (TomlConfig, Self) {
        let resolver = ConfigResolver::new(CONFIG_ENV_VAR);
        let toml = TomlConfig::load_or_default(&resolver, cli_arg);
        let runtime = Self::from_toml(&toml);
        (toml, runtime)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}
