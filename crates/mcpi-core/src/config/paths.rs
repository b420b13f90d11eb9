//! Path resolution for mcpi's own files.
//!
//! `MCPI_HOME` relocates everything under one directory, otherwise the
//! platform config/data directories are used.

use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "mcpi";
pub const SETTINGS_FILE: &str = "settings.toml";
pub const REGISTRY_FILE: &str = "registry.json";

/// Base directories for configuration (registry, settings) and data
/// (cloned servers, wrapper scripts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl BaseDirs {
    /// Resolve base directories, honoring `MCPI_HOME` from `env`.
    pub fn resolve_with(env: &dyn Fn(&str) -> Option<String>) -> Self {
        if let Some(home) = non_empty(env("MCPI_HOME")) {
            let root = expand_tilde(&home);
            return Self::under(root);
        }

        let config_dir = dirs::config_dir()
            .map(|p| p.join(APP_DIR))
            .unwrap_or_else(|| expand_tilde("~/.config/mcpi"));
        let data_dir = dirs::data_local_dir()
            .map(|p| p.join(APP_DIR))
            .unwrap_or_else(|| expand_tilde("~/.local/share/mcpi"));

        Self {
            config_dir,
            data_dir,
        }
    }

    /// Put configuration and data in the same directory.
    pub fn under(root: PathBuf) -> Self {
        Self {
            config_dir: root.clone(),
            data_dir: root,
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.config_dir.join(REGISTRY_FILE)
    }

    /// Directory under which cloned servers live.
    pub fn install_root(&self) -> PathBuf {
        self.data_dir.join("servers")
    }

    /// Directory for generated wrapper scripts.
    pub fn bin_dir(&self) -> PathBuf {
        self.data_dir.join("bin")
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Resolve a settings-file path: `~` expanded, relative paths kept as-is.
pub(crate) fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => expand_tilde(s),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcpi_home_relocates_everything() {
        let env = |key: &str| (key == "MCPI_HOME").then(|| "/tmp/mcpi-home".to_string());
        let dirs = BaseDirs::resolve_with(&env);

        assert_eq!(dirs.registry_path(), PathBuf::from("/tmp/mcpi-home/registry.json"));
        assert_eq!(dirs.install_root(), PathBuf::from("/tmp/mcpi-home/servers"));
        assert_eq!(dirs.bin_dir(), PathBuf::from("/tmp/mcpi-home/bin"));
    }

    #[test]
    fn blank_mcpi_home_is_ignored() {
        let env = |key: &str| (key == "MCPI_HOME").then(|| "   ".to_string());
        let dirs = BaseDirs::resolve_with(&env);
        assert!(dirs.config_dir.ends_with(APP_DIR));
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/etc/mcpi"), PathBuf::from("/etc/mcpi"));
    }
}
