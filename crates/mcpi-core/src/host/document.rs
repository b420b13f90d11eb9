//! Read-merge-write access to the host application's JSON config.
//!
//! The document belongs to another program, so everything outside the
//! `mcpServers` object is carried through untouched.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{McpiError, McpiResult};

/// Top-level key holding the server launch entries.
pub const SERVERS_KEY: &str = "mcpServers";

/// The host config file at a fixed path.
#[derive(Debug, Clone)]
pub struct HostConfig {
    path: PathBuf,
}

impl HostConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing or unreadable file is an empty object;
    /// a file that is not a JSON object is an error so it never gets
    /// overwritten.
    pub fn load(&self) -> McpiResult<Map<String, Value>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Host config {} does not exist yet", self.path.display());
                return Ok(Map::new());
            }
            Err(e) => {
                warn!(
                    "Could not read host config {}, starting from an empty document: {}",
                    self.path.display(),
                    e
                );
                return Ok(Map::new());
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            McpiError::json(
                format!("Failed to parse host config {}", self.path.display()),
                e,
            )
        })?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(McpiError::io(
                format!("Host config {}", self.path.display()),
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "expected a JSON object at the root",
                ),
            )),
        }
    }

    /// Write the document pretty-printed, creating parent directories.
    pub fn write(&self, root: &Map<String, Value>) -> McpiResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                McpiError::io(
                    format!("Failed to create config directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        let mut bytes = serde_json::to_vec_pretty(root)
            .map_err(|e| McpiError::json("Failed to serialize host config", e))?;
        bytes.push(b'\n');
        std::fs::write(&self.path, bytes).map_err(|e| {
            McpiError::io(
                format!("Failed to write host config: {}", self.path.display()),
                e,
            )
        })
    }

    /// Load, let `update` change the `mcpServers` object, and write back.
    /// Returns the updated `mcpServers` object.
    pub fn update_servers<F>(&self, update: F) -> McpiResult<Map<String, Value>>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let mut root = self.load()?;
        let mut servers = take_servers(&mut root);
        update(&mut servers);
        root.insert(SERVERS_KEY.to_string(), Value::Object(servers.clone()));
        self.write(&root)?;
        Ok(servers)
    }
}

/// Remove and return the `mcpServers` object of `root`. A non-object value
/// under the key is dropped.
fn take_servers(root: &mut Map<String, Value>) -> Map<String, Value> {
    match root.remove(SERVERS_KEY) {
        Some(Value::Object(map)) => map,
        Some(other) => {
            warn!(
                "'{}' holds {} instead of an object; replacing it",
                SERVERS_KEY,
                json_kind(&other)
            );
            Map::new()
        }
        None => Map::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
