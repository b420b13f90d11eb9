//! Conversion of index packages into registry records.

use super::IndexPackage;
use crate::registry::ServerRecord;

/// Tag added to every discovered record.
pub const DISCOVERY_TAG: &str = "mcp";

/// Conventional prefix of server package names.
const SERVER_PREFIX: &str = "server-";

/// Derive the short server type from a package name:
/// `@ns/server-github` → `github`.
pub fn server_type(package_name: &str) -> &str {
    let last = package_name.rsplit('/').next().unwrap_or(package_name);
    last.strip_prefix(SERVER_PREFIX).unwrap_or(last)
}

/// Command used to run a package without installing it.
pub fn npx_command(package_name: &str) -> String {
    format!("npx -y {}", package_name)
}

/// Build a record for `package`, or `None` for the SDK package itself.
pub fn normalize(package: IndexPackage, sdk_package: &str) -> Option<ServerRecord> {
    if package.name == sdk_package {
        return None;
    }

    let kind = server_type(&package.name).to_string();
    let description = package
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("MCP server for {}", kind));

    let mut record = ServerRecord::new(
        package.name.clone(),
        package.repository.unwrap_or_default(),
        npx_command(&package.name),
    )
    .with_description(description)
    .with_keywords(package.keywords)
    .with_keywords([kind, DISCOVERY_TAG.to_string()]);

    record.readme = package.readme.filter(|r| !r.trim().is_empty());
    Some(record)
}
