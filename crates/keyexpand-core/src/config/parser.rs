// Keyexpand Config Parser - TOML with Serde
// Parses configuration from TOML files

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::input::{default_device_paths, FrameLayout};
use crate::state::{EntryError, SubstitutionEntry};
use crate::supervisor::{Backoff, RestartPolicy};
use crate::symbol::{KeySymbol, KeySymbolTable};

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key code in [symbols]: {0}")]
    InvalidKeyCode(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(#[from] EntryError),
}

/// Main configuration structure (root TOML table)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub devices: DevicesConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub restart: RestartConfig,

    /// Replacement key table: code -> symbol name
    #[serde(default)]
    pub symbols: HashMap<String, String>,

    /// Substitution entries
    #[serde(default, rename = "entry")]
    pub entries: Vec<SubstitutionEntry>,
}

/// General settings
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Frame size override in bytes (defaults to the native input_event size)
    pub frame_size: Option<usize>,
}

/// Device list configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DevicesConfig {
    /// Device paths to monitor
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// Output throttle delays
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub key_pre_delay_ms: Option<u64>,
    pub key_post_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Never,
    Backoff,
}

/// Worker restart configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RestartConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    pub initial_ms: Option<u64>,
    pub max_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub layout: FrameLayout,
    /// Configured device paths (empty = use the defaults)
    pub device_paths: Vec<PathBuf>,
    pub key_pre_delay_ms: u64,
    pub key_post_delay_ms: u64,
    pub restart_policy: RestartPolicy,
    pub symbols: KeySymbolTable,
    pub entries: Vec<SubstitutionEntry>,
    /// Path to the config file (for reload)
    pub source_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: FrameLayout::native(),
            device_paths: Vec::new(),
            key_pre_delay_ms: 0,
            key_post_delay_ms: 0,
            restart_policy: RestartPolicy::Never,
            symbols: KeySymbolTable::us_qwerty(),
            entries: Vec::new(),
            source_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path)?;
        let mut config = Self::from_toml(&content)?;
        config.source_path = Some(path.as_ref().to_path_buf());
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        toml_config.to_config()
    }

    /// Get the default config path (~/.config/keyexpand/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("keyexpand").join("config.toml"))
    }

    /// Load `path`, writing the default config there first if it is missing.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, default_config_content())?;
            log::info!("Created new config file: {}", path.display());
        }
        Self::from_toml_path(path)
    }

    /// Re-read the file this config was loaded from
    pub fn reload(&self) -> Result<Self, ConfigError> {
        match &self.source_path {
            Some(path) => Self::from_toml_path(path),
            None => Err(ConfigError::InvalidValue("No source path set".to_string())),
        }
    }

    /// Device paths to monitor: CLI overrides > config > event0..event7.
    pub fn resolve_device_paths(&self, cli_paths: &[PathBuf]) -> Vec<PathBuf> {
        if !cli_paths.is_empty() {
            cli_paths.to_vec()
        } else if !self.device_paths.is_empty() {
            self.device_paths.clone()
        } else {
            default_device_paths()
        }
    }
}

impl ConfigToml {
    pub fn to_config(self) -> Result<Config, ConfigError> {
        let layout = match self.general.frame_size {
            Some(size) => FrameLayout::with_size(size)
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?,
            None => FrameLayout::native(),
        };

        let restart_policy = self.restart.to_policy()?;

        let symbols = if self.symbols.is_empty() {
            KeySymbolTable::us_qwerty()
        } else {
            parse_symbols(&self.symbols)?
        };

        validate_entries(&self.entries)?;
        log::debug!("Loaded {} substitution entries", self.entries.len());

        Ok(Config {
            layout,
            device_paths: self.devices.paths,
            key_pre_delay_ms: self.output.key_pre_delay_ms.unwrap_or(0),
            key_post_delay_ms: self.output.key_post_delay_ms.unwrap_or(0),
            restart_policy,
            symbols,
            entries: self.entries,
            source_path: None,
        })
    }
}

impl RestartConfig {
    fn to_policy(&self) -> Result<RestartPolicy, ConfigError> {
        match self.policy {
            PolicyKind::Never => Ok(RestartPolicy::Never),
            PolicyKind::Backoff => {
                let defaults = Backoff::default();
                let backoff = Backoff {
                    initial: self
                        .initial_ms
                        .map_or(defaults.initial, Duration::from_millis),
                    max: self.max_ms.map_or(defaults.max, Duration::from_millis),
                    max_attempts: self.max_attempts.or(defaults.max_attempts),
                };
                if backoff.initial.is_zero() || backoff.initial > backoff.max {
                    return Err(ConfigError::InvalidValue(format!(
                        "restart.initial_ms must be between 1 and max_ms ({}ms)",
                        backoff.max.as_millis()
                    )));
                }
                Ok(RestartPolicy::Backoff(backoff))
            }
        }
    }
}

fn parse_symbols(symbols: &HashMap<String, String>) -> Result<KeySymbolTable, ConfigError> {
    let mut pairs = Vec::with_capacity(symbols.len());
    for (code, name) in symbols {
        let code: u16 = code
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidKeyCode(code.clone()))?;
        if KeySymbol::from_name(name) == KeySymbol::Unknown {
            log::warn!("Ignoring unrecognized symbol name '{}' for code {}", name, code);
        }
        pairs.push((code, name.as_str()));
    }
    Ok(KeySymbolTable::from_names(pairs))
}

fn validate_entries(entries: &[SubstitutionEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for entry in entries {
        entry.validate()?;
        if !seen.insert(entry.name.as_str()) {
            return Err(EntryError::DuplicateName(entry.name.clone()).into());
        }
    }
    Ok(())
}

/// Create default config content for a new installation
pub fn default_config_content() -> &'static str {
    r#"# Keyexpand Configuration
# Place this file at: ~/.config/keyexpand/config.toml

[devices]
# Input devices to monitor (defaults to /dev/input/event0..event7)
# paths = ["/dev/input/event3"]

[output]
# Optional pacing for synthetic keystrokes
key_pre_delay_ms = 0
key_post_delay_ms = 0

[restart]
# "never" leaves a failed device stopped; "backoff" retries it
policy = "never"

# Type the name followed by SPACE or ENTER to expand it
[[entry]]
name = "brb"
description = "be right back"
active = true
"#
}
