//! Server installation.
//!
//! Two strategies, tried in this order unless the caller asks for a clone:
//!
//! ```text
//! SELECT_STRATEGY ─► TRY_NPX ──ok──► DONE (wrapper script)
//!                       │fail
//!                       ▼
//!                     CLONE ─► DEPS ─► BUILD_OR_CUSTOM ──ok──► DONE (clone dir)
//!                                                      └fail─► FAILED
//! ```
//!
//! The ephemeral strategy succeeds when `npx` exits with status zero;
//! anything it prints on stderr is logged and otherwise ignored. Clone and
//! build steps are never retried: the first failing step aborts with the
//! tool's own error text.

pub mod resolve;
pub mod wrapper;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::discovery::{PackageIndex, server_type};
use crate::error::{McpiError, McpiResult};
use crate::process::{CommandSpec, ProcessRunner};
use crate::registry::{RegistryStore, ServerRecord};

pub use resolve::{GitHubRepo, PackageResolver, last_path_segment};
pub use wrapper::{is_package_name, wrapper_name, write_wrapper};

/// Build steps used when a record has no custom install commands.
pub const DEFAULT_BUILD_STEPS: [&str; 3] = ["npm install", "npm run build", "npm install -g ."];

/// Request to install a registered server.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Exact name or name fragment of a registered server
    pub server_name: String,
    /// Try the `npx` strategy before cloning
    pub prefer_ephemeral: bool,
}

impl InstallRequest {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            prefer_ephemeral: true,
        }
    }

    pub fn with_clone(mut self) -> Self {
        self.prefer_ephemeral = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMethod {
    /// Runs through `npx`; location is the wrapper script
    #[serde(rename = "npx")]
    Ephemeral,
    /// Cloned and built; location is the clone directory
    Clone,
}

/// Report from a successful installation.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub server: String,
    pub method: InstallMethod,
    pub location: PathBuf,
    /// Package identifier used by the npx strategy
    pub package: Option<String>,
    /// Non-fatal problems, such as a failed npx attempt before cloning
    pub warnings: Vec<String>,
}

/// Executes installs for registry entries.
pub struct Installer<'a> {
    settings: &'a Settings,
    runner: &'a dyn ProcessRunner,
    index: &'a dyn PackageIndex,
}

impl<'a> Installer<'a> {
    pub fn new(
        settings: &'a Settings,
        runner: &'a dyn ProcessRunner,
        index: &'a dyn PackageIndex,
    ) -> Self {
        Self {
            settings,
            runner,
            index,
        }
    }

    /// Install the server named by `request`.
    pub fn install(
        &self,
        registry: &RegistryStore,
        request: &InstallRequest,
    ) -> McpiResult<InstallOutcome> {
        let record = registry
            .resolve(&request.server_name)
            .ok_or_else(|| McpiError::NotRegistered(request.server_name.clone()))?;

        info!(
            "Installing '{}' ({} first)",
            record.name,
            if request.prefer_ephemeral { "npx" } else { "clone" }
        );

        if !request.prefer_ephemeral {
            return self.install_clone(record, Vec::new());
        }

        match self.install_npx(record) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(
                    "npx install of '{}' failed, falling back to clone: {}",
                    record.name, e
                );
                self.install_clone(record, vec![format!("npx install failed: {}", e)])
            }
        }
    }

    fn install_npx(&self, record: &ServerRecord) -> McpiResult<InstallOutcome> {
        let resolver = PackageResolver::new(self.runner, self.index, &self.settings.namespace);
        let package = resolver.resolve(&record.repo_url)?;
        debug!("Resolved '{}' to package {}", record.name, package);
        if !is_package_name(&package) {
            return Err(McpiError::ValidationFailure(format!(
                "Resolved '{}' to '{}', which is not an npm package name",
                record.name, package
            )));
        }

        let probe = CommandSpec::new("npx", ["-y", package.as_str(), "--help"]);
        let output = self
            .runner
            .run(&probe)
            .map_err(|e| McpiError::shell(probe.display(), e.to_string()))?;
        if !output.succeeded() {
            return Err(McpiError::shell(probe.display(), output.failure_detail()));
        }
        if !output.stderr.trim().is_empty() {
            debug!("npx stderr for {}: {}", package, output.stderr.trim());
        }

        let name = wrapper_name(&record.command)
            .unwrap_or_else(|| server_type(&package).to_string());
        let location = write_wrapper(&self.settings.bin_dir, &name, &package)?;

        info!(
            "Installed '{}' via npx, wrapper at {}",
            record.name,
            location.display()
        );
        Ok(InstallOutcome {
            server: record.name.clone(),
            method: InstallMethod::Ephemeral,
            location,
            package: Some(package),
            warnings: Vec::new(),
        })
    }

    fn install_clone(
        &self,
        record: &ServerRecord,
        warnings: Vec<String>,
    ) -> McpiResult<InstallOutcome> {
        let dir_name = last_path_segment(&record.repo_url)
            .ok_or_else(|| McpiError::InvalidRepoUrl(record.repo_url.clone()))?;
        let target = self.settings.install_root.join(dir_name);

        reset_dir(&target)?;

        let clone = CommandSpec::new(
            "git",
            [
                "clone".to_string(),
                record.repo_url.clone(),
                target.to_string_lossy().into_owned(),
            ],
        );
        self.run_step(&clone)?;

        if record.install_commands.is_empty() {
            for step in DEFAULT_BUILD_STEPS {
                self.run_step(&CommandSpec::shell(step).in_dir(&target))?;
            }
        } else {
            for step in &record.install_commands {
                self.run_step(&CommandSpec::shell(step.as_str()).in_dir(&target))?;
            }
        }

        info!("Installed '{}' into {}", record.name, target.display());
        Ok(InstallOutcome {
            server: record.name.clone(),
            method: InstallMethod::Clone,
            location: target,
            package: None,
            warnings,
        })
    }

    fn run_step(&self, spec: &CommandSpec) -> McpiResult<()> {
        info!("Running {}", spec.display());
        let output = self
            .runner
            .run(spec)
            .map_err(|e| McpiError::shell(spec.display(), e.to_string()))?;
        if output.succeeded() {
            Ok(())
        } else {
            Err(McpiError::shell(spec.display(), output.failure_detail()))
        }
    }
}

/// Remove `dir` if present and make sure its parent exists, so clones
/// always start from scratch.
fn reset_dir(dir: &Path) -> McpiResult<()> {
    if dir.exists() {
        debug!("Removing previous install at {}", dir.display());
        std::fs::remove_dir_all(dir).map_err(|e| {
            McpiError::io(format!("Failed to remove {}", dir.display()), e)
        })?;
    }
    if let Some(parent) = dir.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            McpiError::io(format!("Failed to create {}", parent.display()), e)
        })?;
    }
    Ok(())
}

impl std::fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ephemeral => write!(f, "npx"),
            Self::Clone => write!(f, "clone"),
        }
    }
}
