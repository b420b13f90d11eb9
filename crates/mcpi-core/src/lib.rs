//! mcpi Core Library
//!
//! Discovers MCP server packages, keeps a local registry of them, installs
//! them and writes their launch commands into a host application's config.

pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod host;
pub mod install;
pub mod process;
pub mod prompts;
pub mod registry;
pub mod router;
pub mod server;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{BaseDirs, Settings};
    pub use crate::context::AppContext;
    pub use crate::error::{McpiError, McpiResult};

    // Registry
    pub use crate::registry::{CommandConfig, PopulateReport, RegistryStore, ServerRecord};

    // Discovery
    pub use crate::discovery::{IndexPackage, NpmIndex, PackageIndex, RetryPolicy};

    // Installation
    pub use crate::install::{InstallMethod, InstallOutcome, InstallRequest, Installer};
    pub use crate::process::{CommandSpec, ProcessOutput, ProcessRunner, SystemRunner};

    // Host config
    pub use crate::host::{HostConfig, Reconciler};

    // Protocol surface
    pub use crate::router::{Router, RouterError, ToolCall, ToolResponse};
    pub use crate::server::McpServer;
}
