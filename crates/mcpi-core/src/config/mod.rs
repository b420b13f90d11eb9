//! Settings for mcpi itself.
//!
//! Settings come from an optional `settings.toml` in the mcpi config
//! directory, then environment overrides:
//! - `MCPI_HOME`: keep registry, clones and wrappers under one directory
//! - `MCP_CLIENT_CONFIG_PATH`: the host application's config file

pub mod parser;
pub mod paths;
pub mod settings;

pub use parser::{parse_settings_toml, parse_settings_toml_str};
pub use paths::BaseDirs;
pub use settings::{HOST_CONFIG_ENV, Settings, SettingsFile};
