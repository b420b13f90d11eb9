//! Host application config reconciliation.
//!
//! mcpi never owns the host config file. It only writes entries under
//! `mcpServers` and keeps every other key as it found it.

pub mod document;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::error::{McpiError, McpiResult};
use crate::registry::{CommandConfig, RegistryStore};

pub use document::{HostConfig, SERVERS_KEY};

/// Writes launch commands into the host config.
pub struct Reconciler<'a> {
    host_path: Option<&'a Path>,
}

impl<'a> Reconciler<'a> {
    pub fn new(host_path: Option<&'a Path>) -> Self {
        Self { host_path }
    }

    fn host(&self) -> McpiResult<HostConfig> {
        self.host_path
            .map(HostConfig::new)
            .ok_or(McpiError::MissingConfigPath)
    }

    /// Set `mcpServers[server_name]` to `config` and record it on the
    /// registry entry.
    ///
    /// `server_name` may be a fragment; the host entry is keyed by the name
    /// as given while the registry update goes to the matched record.
    pub fn save_command(
        &self,
        registry: &mut RegistryStore,
        server_name: &str,
        config: CommandConfig,
    ) -> McpiResult<CommandConfig> {
        let record_name = registry
            .resolve(server_name)
            .map(|r| r.name.clone())
            .ok_or_else(|| McpiError::NotRegistered(server_name.to_string()))?;
        let host = self.host()?;

        let entry = serde_json::to_value(&config)
            .map_err(|e| McpiError::json("Failed to serialize command", e))?;
        host.update_servers(|servers| {
            servers.insert(server_name.to_string(), entry);
        })?;
        info!(
            "Saved command for '{}' to {}",
            server_name,
            host.path().display()
        );

        registry.set_command_config(&record_name, config.clone())?;
        Ok(config)
    }

    /// Validate a user-supplied config blob and merge its `mcpServers`
    /// entries into the host config. Nothing is written unless every entry
    /// is valid. Returns the merged `mcpServers` object.
    pub fn parse_config(&self, raw: &str) -> McpiResult<Map<String, Value>> {
        let host = self.host()?;
        let incoming = validate_config(raw)?;
        let count = incoming.len();

        let merged = host.update_servers(|servers| {
            for (name, entry) in incoming {
                servers.insert(name, entry);
            }
        })?;
        info!(
            "Merged {} server entries into {}",
            count,
            host.path().display()
        );
        Ok(merged)
    }
}

/// Parse `raw` and check every `mcpServers` entry. Returns the entries as
/// supplied, including any extra fields the host understands.
pub fn validate_config(raw: &str) -> McpiResult<Map<String, Value>> {
    let root: Value = serde_json::from_str(raw)
        .map_err(|e| McpiError::ValidationFailure(format!("not valid JSON: {}", e)))?;

    let servers = root
        .get(SERVERS_KEY)
        .and_then(Value::as_object)
        .ok_or_else(|| {
            McpiError::ValidationFailure(format!("expected an object under '{}'", SERVERS_KEY))
        })?;

    let mut validated = Map::new();
    for (name, entry) in servers {
        validate_entry(name, entry)?;
        validated.insert(name.clone(), entry.clone());
    }
    Ok(validated)
}

fn validate_entry(name: &str, entry: &Value) -> McpiResult<CommandConfig> {
    let invalid = |reason: &str| McpiError::ValidationFailure(format!("server '{}' {}", name, reason));

    let entry = entry
        .as_object()
        .ok_or_else(|| invalid("must be an object"))?;

    let command = entry
        .get("command")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| invalid("needs a non-empty 'command' string"))?;

    let args = entry
        .get("args")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("needs an 'args' array"))?
        .iter()
        .map(|a| a.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid("has a non-string value in 'args'"))?;

    let env = match entry.get("env") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(vars)) => vars
            .iter()
            .map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect::<Option<BTreeMap<_, _>>>()
            .ok_or_else(|| invalid("has a non-string value in 'env'"))?,
        Some(_) => return Err(invalid("has an 'env' that is not an object")),
    };

    Ok(CommandConfig::new(command, args).with_env(env))
}
