//! Registry store for loading and saving registry.json.

use std::path::{Path, PathBuf};

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::schema::{CommandConfig, RegistryFile, RegistryServers, ServerRecord};
use crate::error::{McpiError, McpiResult};

/// Result of merging discovered records into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Names appended to the registry
    pub added: Vec<String>,
    /// Existing names whose missing README was filled in
    pub readme_backfilled: Vec<String>,
}

impl PopulateReport {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.readme_backfilled.is_empty()
    }
}

/// Authoritative name → record mapping, persisted after every mutation.
///
/// Mutations are written to disk before they replace the in-memory map, so
/// a failed write leaves the store as it was.
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    servers: IndexMap<String, ServerRecord>,
}

impl RegistryStore {
    /// Load the registry at `path`.
    ///
    /// A missing file yields an empty registry which is written out
    /// immediately. Unparsable content is reported as `CorruptRegistry`.
    /// Both the map and the array form of `servers` are accepted; records
    /// are keyed by their `name` whatever the file says.
    pub fn load(path: impl Into<PathBuf>) -> McpiResult<Self> {
        let path = path.into();

        if !path.exists() {
            let store = Self {
                path,
                servers: IndexMap::new(),
            };
            write_registry(&store.path, &store.servers)?;
            info!("Initialized empty registry at {}", store.path.display());
            return Ok(store);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| McpiError::io(format!("Failed to read {}", path.display()), e))?;
        let file: RegistryFile =
            serde_json::from_str(&content).map_err(|e| McpiError::CorruptRegistry {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if matches!(file.servers, RegistryServers::List(_)) {
            debug!("{} uses the array form; next save writes the map form", path.display());
        }
        let servers = file.servers.into_map();

        debug!("Loaded {} servers from {}", servers.len(), path.display());
        Ok(Self { path, servers })
    }

    /// Load the registry, replacing a corrupt file with an empty registry.
    ///
    /// The corrupt file is kept next to the original as `<name>.corrupt`.
    pub fn load_or_reset(path: impl Into<PathBuf>) -> McpiResult<Self> {
        let path = path.into();
        match Self::load(&path) {
            Err(McpiError::CorruptRegistry { reason, .. }) => {
                let backup = corrupt_backup_path(&path);
                warn!(
                    "Registry {} is corrupt ({}); starting empty, old content kept at {}",
                    path.display(),
                    reason,
                    backup.display()
                );
                std::fs::rename(&path, &backup).map_err(|e| {
                    McpiError::io(format!("Failed to move aside {}", path.display()), e)
                })?;
                Self::load(path)
            }
            other => other,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// All records in insertion order.
    pub fn list(&self) -> impl Iterator<Item = &ServerRecord> {
        self.servers.values()
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&ServerRecord> {
        self.servers.get(name)
    }

    /// First record (insertion order) whose name contains `fragment`.
    pub fn find(&self, fragment: &str) -> Option<&ServerRecord> {
        self.servers.values().find(|r| r.name.contains(fragment))
    }

    /// Exact lookup, falling back to the substring match of [`find`].
    ///
    /// [`find`]: RegistryStore::find
    pub fn resolve(&self, name: &str) -> Option<&ServerRecord> {
        self.get(name).or_else(|| self.find(name))
    }

    /// Insert or fully replace the record with the same name.
    pub fn upsert(&mut self, record: ServerRecord) -> McpiResult<()> {
        let name = record.name.clone();
        let mut servers = self.servers.clone();
        let replaced = servers.insert(name.clone(), record).is_some();
        self.commit(servers)?;
        if replaced {
            info!("Replaced registry entry '{}'", name);
        } else {
            info!("Registered '{}'", name);
        }
        Ok(())
    }

    /// Remove by exact name. Returns `false` (and writes nothing) if absent.
    pub fn remove(&mut self, name: &str) -> McpiResult<bool> {
        if !self.servers.contains_key(name) {
            return Ok(false);
        }
        let mut servers = self.servers.clone();
        servers.shift_remove(name);
        self.commit(servers)?;
        info!("Removed '{}' from registry", name);
        Ok(true)
    }

    /// Record the command last written to the host config.
    pub fn set_command_config(&mut self, name: &str, config: CommandConfig) -> McpiResult<()> {
        let mut servers = self.servers.clone();
        let record = servers
            .get_mut(name)
            .ok_or_else(|| McpiError::NotRegistered(name.to_string()))?;
        record.command_config = Some(config);
        self.commit(servers)
    }

    /// Merge discovered records.
    ///
    /// New names are appended. Existing records are left alone except that a
    /// missing README is filled in from the discovered one.
    pub fn merge_discovered(
        &mut self,
        records: impl IntoIterator<Item = ServerRecord>,
    ) -> McpiResult<PopulateReport> {
        let mut report = PopulateReport::default();
        let mut servers = self.servers.clone();

        for record in records {
            match servers.get_mut(&record.name) {
                Some(existing) => {
                    if existing.readme.is_none() && record.readme.is_some() {
                        existing.readme = record.readme;
                        report.readme_backfilled.push(record.name);
                    }
                }
                None => {
                    report.added.push(record.name.clone());
                    servers.insert(record.name.clone(), record);
                }
            }
        }

        if report.changed() {
            self.commit(servers)?;
            info!(
                "Discovery added {} servers, backfilled {} READMEs",
                report.added.len(),
                report.readme_backfilled.len()
            );
        }
        Ok(report)
    }

    fn commit(&mut self, servers: IndexMap<String, ServerRecord>) -> McpiResult<()> {
        write_registry(&self.path, &servers)?;
        self.servers = servers;
        Ok(())
    }
}

fn write_registry(path: &Path, servers: &IndexMap<String, ServerRecord>) -> McpiResult<()> {
    let file = RegistryFile {
        servers: RegistryServers::Map(servers.clone()),
        last_updated: Some(Utc::now()),
    };
    let content = serde_json::to_string_pretty(&file)
        .map_err(|e| McpiError::json("Failed to serialize registry", e))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            McpiError::io(
                format!("Failed to create registry directory: {}", parent.display()),
                e,
            )
        })?;
    }
    std::fs::write(path, content).map_err(|e| {
        McpiError::io(format!("Failed to write registry: {}", path.display()), e)
    })
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".corrupt");
    path.with_file_name(name)
}
