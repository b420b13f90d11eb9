//! Wrapper scripts for servers run through `npx`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{McpiError, McpiResult};

static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@[A-Za-z0-9][A-Za-z0-9._~-]*/)?[A-Za-z0-9][A-Za-z0-9._~-]*$")
        .expect("valid package name pattern")
});

/// Whether `package` is a plain (optionally scoped) npm package name.
///
/// Only such names are written into wrapper scripts; they contain nothing
/// the shell would interpret.
pub fn is_package_name(package: &str) -> bool {
    PACKAGE_NAME.is_match(package)
}

/// File name of the wrapper for a record's `command`.
///
/// Uses the last path segment of the command's last token, so
/// `npx -y @ns/server-x` becomes `server-x`. Characters outside
/// `[A-Za-z0-9._-]` are replaced with `-`.
pub fn wrapper_name(command: &str) -> Option<String> {
    let token = command.split_whitespace().last()?;
    let segment = token.rsplit('/').next()?;
    let name: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let name = name.trim_matches(|c| c == '.' || c == '-').to_string();
    (!name.is_empty()).then_some(name)
}

fn script_body(package: &str) -> String {
    if cfg!(windows) {
        format!("@echo off\r\nnpx -y {} %*\r\n", package)
    } else {
        format!("#!/bin/sh\nexec npx -y {} \"$@\"\n", package)
    }
}

/// Write an executable wrapper that runs `package` through npx and
/// forwards all arguments. Returns the script path.
///
/// Fails with `ValidationFailure` when `package` is not a package name.
pub fn write_wrapper(bin_dir: &Path, name: &str, package: &str) -> McpiResult<PathBuf> {
    if !is_package_name(package) {
        return Err(McpiError::ValidationFailure(format!(
            "Refusing to write a wrapper for '{}': not an npm package name",
            package
        )));
    }

    std::fs::create_dir_all(bin_dir).map_err(|e| {
        McpiError::io(
            format!("Failed to create wrapper directory: {}", bin_dir.display()),
            e,
        )
    })?;

    let path = if cfg!(windows) {
        bin_dir.join(format!("{}.cmd", name))
    } else {
        bin_dir.join(name)
    };

    std::fs::write(&path, script_body(package)).map_err(|e| {
        McpiError::io(format!("Failed to write wrapper: {}", path.display()), e)
    })?;
    set_executable(&path)?;
    Ok(path)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> McpiResult<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
        McpiError::io(
            format!("Failed to mark wrapper executable: {}", path.display()),
            e,
        )
    })
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> McpiResult<()> {
    Ok(())
}
