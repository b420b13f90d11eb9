//! Resolved runtime settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::parser;
use super::paths::{BaseDirs, expand_path, non_empty};
use crate::discovery::RetryPolicy;

pub const DEFAULT_NAMESPACE: &str = "@modelcontextprotocol";
pub const DEFAULT_INDEX_URL: &str = "https://registry.npmjs.org";
pub const HOST_CONFIG_ENV: &str = "MCP_CLIENT_CONFIG_PATH";

const DEFAULT_DISCOVERY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Contents of `settings.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    /// npm scope queried for servers (e.g. "@modelcontextprotocol")
    pub namespace: Option<String>,
    /// Base URL of the npm-compatible package index
    pub index_url: Option<String>,
    pub registry_path: Option<PathBuf>,
    pub install_root: Option<PathBuf>,
    pub bin_dir: Option<PathBuf>,
    /// Host application config file (the one holding `mcpServers`)
    pub host_config_path: Option<PathBuf>,
    pub discovery_attempts: Option<u32>,
    pub discovery_retry_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    /// Fetch each package document during discovery to cache its README
    pub fetch_readmes: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub namespace: String,
    pub index_url: String,
    pub registry_path: PathBuf,
    pub install_root: PathBuf,
    pub bin_dir: PathBuf,
    pub host_config_path: Option<PathBuf>,
    pub discovery: RetryPolicy,
    pub request_timeout: Duration,
    pub fetch_readmes: bool,
}

impl Settings {
    /// Load settings from the default location and the process environment.
    pub fn load() -> anyhow::Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let dirs = BaseDirs::resolve_with(&env);
        Self::resolve_with(&dirs, &env)
    }

    /// Resolve settings from `settings.toml` under `dirs` plus environment
    /// overrides looked up through `env`.
    pub fn resolve_with(
        dirs: &BaseDirs,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let settings_path = dirs.settings_path();
        let file = if settings_path.exists() {
            parser::parse_settings_toml(&settings_path)?
        } else {
            SettingsFile::default()
        };

        let mut settings = Self::from_file(dirs, file);
        if let Some(path) = non_empty(env(HOST_CONFIG_ENV)) {
            settings.host_config_path = Some(expand_path(Path::new(&path)));
        }
        Ok(settings)
    }

    /// Defaults for everything, rooted at `dirs`.
    pub fn defaults(dirs: &BaseDirs) -> Self {
        Self::from_file(dirs, SettingsFile::default())
    }

    fn from_file(dirs: &BaseDirs, file: SettingsFile) -> Self {
        let delay_ms = file
            .discovery_retry_delay_ms
            .unwrap_or(DEFAULT_RETRY_DELAY_MS);

        Self {
            namespace: file
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            index_url: file
                .index_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string()),
            registry_path: file
                .registry_path
                .map(|p| expand_path(&p))
                .unwrap_or_else(|| dirs.registry_path()),
            install_root: file
                .install_root
                .map(|p| expand_path(&p))
                .unwrap_or_else(|| dirs.install_root()),
            bin_dir: file
                .bin_dir
                .map(|p| expand_path(&p))
                .unwrap_or_else(|| dirs.bin_dir()),
            host_config_path: file.host_config_path.map(|p| expand_path(&p)),
            discovery: RetryPolicy {
                attempts: file
                    .discovery_attempts
                    .unwrap_or(DEFAULT_DISCOVERY_ATTEMPTS)
                    .max(1),
                delay: Duration::from_millis(delay_ms),
            },
            request_timeout: Duration::from_secs(
                file.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            fetch_readmes: file.fetch_readmes.unwrap_or(true),
        }
    }

    /// Package name of the SDK, which is never treated as a server.
    pub fn sdk_package(&self) -> String {
        format!("{}/sdk", self.namespace)
    }
}
