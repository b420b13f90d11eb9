//! Registry entry schema
//!
//! Defines the metadata kept for every known MCP server

use std::collections::BTreeMap;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One installable MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    /// Unique identifier, possibly a scoped package name (`@ns/foo`)
    pub name: String,

    /// Source repository; empty when unknown
    #[serde(default)]
    pub repo_url: String,

    /// Token used to invoke the server once installed
    pub command: String,

    #[serde(default)]
    pub description: String,

    /// Tags used for matching, kept in insertion order
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Shell instructions run after clone instead of the default build
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub install_commands: Vec<String>,

    /// Last invocation written to the host config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_config: Option<CommandConfig>,

    /// Cached documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
}

impl ServerRecord {
    pub fn new(
        name: impl Into<String>,
        repo_url: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            repo_url: repo_url.into(),
            command: command.into(),
            description: String::new(),
            keywords: Vec::new(),
            install_commands: Vec::new(),
            command_config: None,
            readme: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for keyword in keywords {
            self.add_keyword(keyword);
        }
        self
    }

    pub fn with_install_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.install_commands = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_readme(mut self, readme: impl Into<String>) -> Self {
        self.readme = Some(readme.into());
        self
    }

    /// Append a keyword unless it is already present.
    pub fn add_keyword(&mut self, keyword: impl Into<String>) {
        let keyword = keyword.into();
        if !keyword.is_empty() && !self.keywords.contains(&keyword) {
            self.keywords.push(keyword);
        }
    }

    /// Whether a non-empty README is cached.
    pub fn has_readme(&self) -> bool {
        self.readme.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

/// Structured run command as written under the host's `mcpServers` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CommandConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl CommandConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

/// On-disk registry document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryFile {
    #[serde(default)]
    pub servers: RegistryServers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

/// The `servers` value: a name-keyed map, or a plain array of records in
/// older files. Saves always write the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryServers {
    Map(IndexMap<String, ServerRecord>),
    List(Vec<ServerRecord>),
}

impl Default for RegistryServers {
    fn default() -> Self {
        Self::Map(IndexMap::new())
    }
}

impl RegistryServers {
    /// Records keyed by their own `name`. Map keys are ignored; when two
    /// records share a name the later one wins and keeps the earlier slot.
    pub fn into_map(self) -> IndexMap<String, ServerRecord> {
        let records: Vec<ServerRecord> = match self {
            Self::Map(map) => map.into_values().collect(),
            Self::List(list) => list,
        };
        let mut servers = IndexMap::with_capacity(records.len());
        for record in records {
            servers.insert(record.name.clone(), record);
        }
        servers
    }
}
