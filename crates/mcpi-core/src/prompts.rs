//! Text handed to the host model alongside a server's README.

use std::fmt::Write;

use crate::registry::ServerRecord;

/// Guidance returned by `configureServer`.
///
/// Tells the model which server it is configuring, what the user wants
/// from it, and that the chosen command must be stored with `saveCommand`.
pub fn configure_explanation(
    record: &ServerRecord,
    purpose: Option<&str>,
    query: Option<&str>,
) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Configuring MCP server '{}'.", record.name);
    if !record.description.is_empty() {
        let _ = writeln!(text, "Description: {}", record.description);
    }
    let _ = writeln!(text, "Default command: {}", record.command);

    if let Some(purpose) = purpose.filter(|p| !p.trim().is_empty()) {
        let _ = writeln!(text, "Purpose: {}", purpose.trim());
    }
    if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
        let _ = writeln!(text, "User request: {}", query.trim());
    }

    text.push('\n');
    if record.has_readme() {
        text.push_str(
            "Read the README to find the command, arguments and environment \
             variables this server needs. ",
        );
    } else {
        text.push_str("No README is cached for this server; start from the default command. ");
    }
    let _ = write!(
        text,
        "Once you have chosen them, call saveCommand with serverName \"{}\", \
         the command, its args and any env values to write the entry into the \
         host configuration.",
        record.name
    );
    text
}
