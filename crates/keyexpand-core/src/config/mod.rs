// Keyexpand Config
// TOML configuration: devices, output pacing, restart policy, symbols and entries

pub mod parser;

pub use parser::{default_config_content, Config, ConfigError, ConfigToml};
