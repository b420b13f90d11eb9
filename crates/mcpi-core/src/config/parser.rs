//! TOML parser with helpful error messages

use super::settings::SettingsFile;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse settings.toml with detailed error messages
pub fn parse_settings_toml(path: &Path) -> Result<SettingsFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

    parse_settings_toml_str(&content)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

/// Parse settings.toml content from string
pub fn parse_settings_toml_str(content: &str) -> Result<SettingsFile> {
    let settings: SettingsFile =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;
    Ok(settings)
}

/// Enhance TOML parsing errors with the offending lines
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error.span().map(|span| {
        content[..span.start.min(content.len())]
            .chars()
            .filter(|c| *c == '\n')
            .count()
            + 1
    });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_settings() {
        let settings = parse_settings_toml_str("").unwrap();
        assert_eq!(settings, SettingsFile::default());
    }

    #[test]
    fn test_parse_partial_settings() {
        let settings = parse_settings_toml_str(
            r#"
namespace = "@acme"
fetch_readmes = false
"#,
        )
        .unwrap();
        assert_eq!(settings.namespace.as_deref(), Some("@acme"));
        assert_eq!(settings.fetch_readmes, Some(false));
        assert!(settings.index_url.is_none());
    }

    #[test]
    fn test_parse_invalid_toml_points_at_line() {
        let err = parse_settings_toml_str("namespace = \"@acme\"\ndiscovery_attempts = \"three\"\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("line 2"), "unexpected error: {}", err);
    }
}
