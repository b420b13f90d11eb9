//! Application context for dependency injection.

use anyhow::Context;
use serde_json::{Map, Value};

use crate::config::Settings;
use crate::discovery::{self, NpmIndex, PackageIndex};
use crate::error::McpiResult;
use crate::host::Reconciler;
use crate::install::{InstallOutcome, InstallRequest, Installer};
use crate::process::{ProcessRunner, SystemRunner};
use crate::registry::{CommandConfig, PopulateReport, RegistryStore};

/// Everything an operation needs: settings, the registry and the two
/// external seams (process execution and the package index).
///
/// Frontends (CLI, stdio server) create this once and hand it to the
/// router by `&mut`.
pub struct AppContext {
    settings: Settings,
    registry: RegistryStore,
    runner: Box<dyn ProcessRunner>,
    index: Box<dyn PackageIndex>,
}

impl AppContext {
    /// Create a context with explicit collaborators.
    pub fn new(
        settings: Settings,
        registry: RegistryStore,
        runner: Box<dyn ProcessRunner>,
        index: Box<dyn PackageIndex>,
    ) -> Self {
        Self {
            settings,
            registry,
            runner,
            index,
        }
    }

    /// Open the registry named by `settings` and wire up the system runner
    /// and the npm index.
    pub fn with_defaults(settings: Settings) -> anyhow::Result<Self> {
        let registry = RegistryStore::load_or_reset(&settings.registry_path).with_context(|| {
            format!(
                "Failed to open registry {}",
                settings.registry_path.display()
            )
        })?;
        let index = NpmIndex::new(&settings)?;
        Ok(Self::new(
            settings,
            registry,
            Box::new(SystemRunner),
            Box::new(index),
        ))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &RegistryStore {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RegistryStore {
        &mut self.registry
    }

    pub fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    pub fn index(&self) -> &dyn PackageIndex {
        self.index.as_ref()
    }

    /// Discover servers and merge them into the registry. Failures are
    /// logged and leave the registry unchanged.
    pub fn populate(&mut self) -> Option<PopulateReport> {
        discovery::populate(&mut self.registry, self.index.as_ref(), &self.settings)
    }

    /// Like [`populate`](Self::populate), but reports discovery failures.
    pub fn try_populate(&mut self) -> McpiResult<PopulateReport> {
        discovery::try_populate(&mut self.registry, self.index.as_ref(), &self.settings)
    }

    pub fn installer(&self) -> Installer<'_> {
        Installer::new(&self.settings, self.runner.as_ref(), self.index.as_ref())
    }

    pub fn install(&self, request: &InstallRequest) -> McpiResult<InstallOutcome> {
        self.installer().install(&self.registry, request)
    }

    pub fn save_command(
        &mut self,
        server_name: &str,
        config: CommandConfig,
    ) -> McpiResult<CommandConfig> {
        Reconciler::new(self.settings.host_config_path.as_deref()).save_command(
            &mut self.registry,
            server_name,
            config,
        )
    }

    pub fn parse_config(&self, raw: &str) -> McpiResult<Map<String, Value>> {
        Reconciler::new(self.settings.host_config_path.as_deref()).parse_config(raw)
    }
}
