//! Local registry of known MCP servers
//!
//! Maps server names to install metadata and persists the mapping to
//! `registry.json` after every mutation.

pub mod schema;
pub mod store;

pub use schema::{CommandConfig, RegistryFile, RegistryServers, ServerRecord};
pub use store::{PopulateReport, RegistryStore};
