//! Tool-call routing.
//!
//! Every operation answers with the same envelope:
//!
//! ```json
//! { "success": true, "message": "...", ...operation fields }
//! { "success": false, "message": "...", "errorCode": "NOT_REGISTERED" }
//! ```
//!
//! Ordinary failures never escape as `Err`. The only hard fault is a tool
//! name the router does not know.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, info};

use crate::context::AppContext;
use crate::error::{McpiError, McpiResult};
use crate::host::SERVERS_KEY;
use crate::install::InstallRequest;
use crate::prompts::configure_explanation;
use crate::registry::{CommandConfig, ServerRecord};

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerNameArgs {
    /// Registered server name (a unique fragment also works where noted)
    pub server_name: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstallArgs {
    pub server_name: String,
    /// Try `npx` before cloning the repository
    #[serde(default = "default_true")]
    pub use_npx: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureArgs {
    pub server_name: String,
    /// What the user wants the server for
    #[serde(default)]
    pub purpose: Option<String>,
    /// The user's original request
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveCommandArgs {
    pub server_name: String,
    pub command: String,
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ParseConfigArgs {
    /// JSON text containing an `mcpServers` object
    pub config: String,
}

/// A parsed tool invocation.
#[derive(Debug, Clone)]
pub enum ToolCall {
    GetAvailableServers,
    InstallServer(InstallArgs),
    RegisterServer(ServerRecord),
    RemoveServer(ServerNameArgs),
    ConfigureServer(ConfigureArgs),
    GetServerReadme(ServerNameArgs),
    SaveCommand(SaveCommandArgs),
    ParseConfig(ParseConfigArgs),
}

/// Name, description and input schema of one tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| json!({"type": "object", "properties": {}}))
}

/// Every tool the router accepts.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "getAvailableServers",
            description: "List every server in the local registry.",
            input_schema: schema_of::<NoArgs>(),
        },
        ToolDefinition {
            name: "installServer",
            description: "Install a registered server, through npx when possible, otherwise by cloning and building it.",
            input_schema: schema_of::<InstallArgs>(),
        },
        ToolDefinition {
            name: "registerServer",
            description: "Add a server to the registry or replace the entry with the same name.",
            input_schema: schema_of::<ServerRecord>(),
        },
        ToolDefinition {
            name: "removeServer",
            description: "Remove a server from the registry by exact name.",
            input_schema: schema_of::<ServerNameArgs>(),
        },
        ToolDefinition {
            name: "configureServer",
            description: "Get a server's README and instructions for choosing its launch command.",
            input_schema: schema_of::<ConfigureArgs>(),
        },
        ToolDefinition {
            name: "getServerReadme",
            description: "Get the cached README of a server.",
            input_schema: schema_of::<ServerNameArgs>(),
        },
        ToolDefinition {
            name: "saveCommand",
            description: "Write a server's launch command into the host configuration under mcpServers.",
            input_schema: schema_of::<SaveCommandArgs>(),
        },
        ToolDefinition {
            name: "parseConfig",
            description: "Validate a JSON config with an mcpServers object and merge it into the host configuration.",
            input_schema: schema_of::<ParseConfigArgs>(),
        },
    ]
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, serde_json::Error> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments)
}

impl ToolCall {
    /// Parse a call by tool name.
    ///
    /// The outer `Err` is a hard fault (unknown tool). The inner `Err` is a
    /// malformed-argument message suitable for a failure envelope.
    pub fn parse(
        name: &str,
        arguments: Value,
    ) -> Result<Result<Self, String>, RouterError> {
        fn typed<T: DeserializeOwned>(
            arguments: Value,
            wrap: fn(T) -> ToolCall,
        ) -> Result<ToolCall, String> {
            parse_args(arguments)
                .map(wrap)
                .map_err(|e| format!("Invalid arguments: {}", e))
        }

        let call = match name {
            "getAvailableServers" => Ok(Self::GetAvailableServers),
            "installServer" => typed(arguments, Self::InstallServer),
            "registerServer" => typed(arguments, Self::RegisterServer),
            "removeServer" => typed(arguments, Self::RemoveServer),
            "configureServer" => typed(arguments, Self::ConfigureServer),
            "getServerReadme" => typed(arguments, Self::GetServerReadme),
            "saveCommand" => typed(arguments, Self::SaveCommand),
            "parseConfig" => typed(arguments, Self::ParseConfig),
            other => return Err(RouterError::UnknownTool(other.to_string())),
        };
        Ok(call)
    }
}

/// Uniform operation result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_code: None,
            data: Map::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_code: None,
            data: Map::new(),
        }
    }

    pub fn from_error(err: &McpiError) -> Self {
        Self {
            error_code: Some(err.code().to_string()),
            ..Self::fail(err.to_string())
        }
    }

    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.data.insert(key.to_string(), value);
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            json!({"success": self.success, "message": self.message})
        })
    }
}

/// Dispatches tool calls against an [`AppContext`].
pub struct Router<'a> {
    ctx: &'a mut AppContext,
}

impl<'a> Router<'a> {
    pub fn new(ctx: &'a mut AppContext) -> Self {
        Self { ctx }
    }

    /// Parse and dispatch a call by tool name.
    pub fn handle(&mut self, name: &str, arguments: Value) -> Result<ToolResponse, RouterError> {
        debug!("Tool call {}", name);
        match ToolCall::parse(name, arguments)? {
            Ok(call) => Ok(self.dispatch(call)),
            Err(message) => Ok(ToolResponse {
                error_code: Some("INVALID_ARGUMENTS".to_string()),
                ..ToolResponse::fail(message)
            }),
        }
    }

    pub fn dispatch(&mut self, call: ToolCall) -> ToolResponse {
        let result = match call {
            ToolCall::GetAvailableServers => Ok(self.available_servers()),
            ToolCall::InstallServer(args) => self.install(args),
            ToolCall::RegisterServer(record) => self.register(record),
            ToolCall::RemoveServer(args) => self.remove(args),
            ToolCall::ConfigureServer(args) => self.configure(args),
            ToolCall::GetServerReadme(args) => self.readme(args),
            ToolCall::SaveCommand(args) => self.save_command(args),
            ToolCall::ParseConfig(args) => self.parse_config(args),
        };
        result.unwrap_or_else(|e| {
            info!("Operation failed: {}", e);
            ToolResponse::from_error(&e)
        })
    }

    fn available_servers(&self) -> ToolResponse {
        let servers: Vec<&ServerRecord> = self.ctx.registry().list().collect();
        ToolResponse::ok(format!("Found {} servers", servers.len())).with("servers", servers)
    }

    fn install(&mut self, args: InstallArgs) -> McpiResult<ToolResponse> {
        let request = InstallRequest {
            server_name: args.server_name,
            prefer_ephemeral: args.use_npx,
        };
        let outcome = self.ctx.install(&request)?;

        let mut response = ToolResponse::ok(format!(
            "Installed {} via {} at {}",
            outcome.server,
            outcome.method,
            outcome.location.display()
        ))
        .with("installLocation", outcome.location.display().to_string())
        .with("method", outcome.method);
        if let Some(package) = &outcome.package {
            response = response.with("package", package);
        }
        if !outcome.warnings.is_empty() {
            response = response.with("warnings", &outcome.warnings);
        }
        Ok(response)
    }

    fn register(&mut self, record: ServerRecord) -> McpiResult<ToolResponse> {
        if record.name.trim().is_empty() {
            return Err(McpiError::ValidationFailure(
                "server name must not be empty".to_string(),
            ));
        }
        let message = format!("Registered {}", record.name);
        self.ctx.registry_mut().upsert(record.clone())?;
        Ok(ToolResponse::ok(message).with("server", record))
    }

    fn remove(&mut self, args: ServerNameArgs) -> McpiResult<ToolResponse> {
        if self.ctx.registry_mut().remove(&args.server_name)? {
            Ok(ToolResponse::ok(format!("Removed {}", args.server_name)))
        } else {
            Err(McpiError::NotRegistered(args.server_name))
        }
    }

    fn configure(&mut self, args: ConfigureArgs) -> McpiResult<ToolResponse> {
        let record = self
            .ctx
            .registry()
            .resolve(&args.server_name)
            .ok_or_else(|| McpiError::NotRegistered(args.server_name.clone()))?;

        let explanation =
            configure_explanation(record, args.purpose.as_deref(), args.query.as_deref());
        Ok(ToolResponse::ok(format!("Configuration guide for {}", record.name))
            .with("readmeContent", &record.readme)
            .with("explanation", explanation))
    }

    fn readme(&mut self, args: ServerNameArgs) -> McpiResult<ToolResponse> {
        let record = self
            .ctx
            .registry()
            .resolve(&args.server_name)
            .ok_or_else(|| McpiError::NotRegistered(args.server_name.clone()))?;

        match record.readme.as_deref().filter(|_| record.has_readme()) {
            Some(readme) => Ok(ToolResponse::ok(format!("README for {}", record.name))
                .with("readmeContent", readme)),
            None => Ok(ToolResponse::fail(format!(
                "No README cached for {}",
                record.name
            ))),
        }
    }

    fn save_command(&mut self, args: SaveCommandArgs) -> McpiResult<ToolResponse> {
        let config = CommandConfig::new(args.command, args.args).with_env(args.env);
        let saved = self.ctx.save_command(&args.server_name, config)?;
        Ok(ToolResponse::ok(format!("Saved command for {}", args.server_name))
            .with("commandConfig", saved))
    }

    fn parse_config(&mut self, args: ParseConfigArgs) -> McpiResult<ToolResponse> {
        let merged = self.ctx.parse_config(&args.config)?;
        let count = merged.len();
        let mut config = Map::new();
        config.insert(SERVERS_KEY.to_string(), Value::Object(merged));
        Ok(ToolResponse::ok(format!(
            "Config saved; host now lists {} servers",
            count
        ))
        .with("config", config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_is_a_hard_fault() {
        let err = ToolCall::parse("formatDisk", Value::Null).unwrap_err();
        assert!(matches!(err, RouterError::UnknownTool(name) if name == "formatDisk"));
    }

    #[test]
    fn install_defaults_to_npx() {
        let call = ToolCall::parse("installServer", json!({"serverName": "git"}))
            .unwrap()
            .unwrap();
        match call {
            ToolCall::InstallServer(args) => {
                assert_eq!(args.server_name, "git");
                assert!(args.use_npx);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn malformed_arguments_are_reported_not_raised() {
        let parsed = ToolCall::parse("saveCommand", json!({"serverName": "git"})).unwrap();
        assert!(parsed.unwrap_err().contains("Invalid arguments"));
    }

    #[test]
    fn failure_envelope_carries_error_code() {
        let response = ToolResponse::from_error(&McpiError::NotRegistered("x".to_string()));
        let value = response.to_json();
        assert_eq!(value["success"], false);
        assert_eq!(value["errorCode"], "NOT_REGISTERED");
    }

    #[test]
    fn every_tool_has_an_object_schema() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), 8);
        for tool in tools {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert!(ToolCall::parse(tool.name, Value::Null).is_ok());
        }
    }
}
