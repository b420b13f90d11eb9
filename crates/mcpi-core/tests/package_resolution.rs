//! Integration tests for repository URL → package resolution.

mod support;

use mcpi_core::error::McpiError;
use mcpi_core::install::PackageResolver;
use mcpi_core::process::ProcessOutput;

use support::{ScriptedRunner, StaticIndex, is_npm_view, package};

const NS: &str = "@modelcontextprotocol";

#[test]
fn npm_view_answer_wins() {
    let (runner, log) = ScriptedRunner::new(|spec| {
        assert!(is_npm_view(spec));
        Ok(ProcessOutput::success("  @acme/weather  \n"))
    });
    let index = StaticIndex::unreachable();
    let calls = index.listing_counter();

    let name = PackageResolver::new(&runner, &index, NS)
        .resolve("https://github.com/acme/weather.git")
        .unwrap();

    assert_eq!(name, "@acme/weather");
    assert_eq!(log.commands().len(), 1);
    assert_eq!(calls.get(), 0);
}

#[test]
fn empty_npm_output_falls_through() {
    let (runner, _log) = ScriptedRunner::new(|_| Ok(ProcessOutput::success("   \n")));
    let index = StaticIndex::empty();

    let name = PackageResolver::new(&runner, &index, NS)
        .resolve("https://github.com/acme/weather")
        .unwrap();

    assert_eq!(name, "@modelcontextprotocol/weather");
}

#[test]
fn index_match_by_repository_path() {
    let (runner, _log) = ScriptedRunner::succeed_all();
    let index = StaticIndex::new(vec![
        package("@modelcontextprotocol/server-other", Some("https://github.com/else/where"), None),
        package(
            "@modelcontextprotocol/server-github",
            Some("https://github.com/ModelContextProtocol/servers"),
            None,
        ),
    ]);
    let searches = index.call_counter();
    let listings = index.listing_counter();

    let name = PackageResolver::new(&runner, &index, NS)
        .resolve("git@github.com:modelcontextprotocol/servers.git")
        .unwrap();

    assert_eq!(name, "@modelcontextprotocol/server-github");
    // Name lookups use the listing only, no per-package documents
    assert_eq!(listings.get(), 1);
    assert_eq!(searches.get(), 0);
}

#[test]
fn index_match_by_name_suffix() {
    let (runner, _log) = ScriptedRunner::succeed_all();
    let index = StaticIndex::new(vec![package("@modelcontextprotocol/server-slack", None, None)]);

    let name = PackageResolver::new(&runner, &index, NS)
        .resolve("https://github.com/someone/server-slack")
        .unwrap();

    assert_eq!(name, "@modelcontextprotocol/server-slack");
}

#[test]
fn github_url_falls_back_to_namespace_convention() {
    let (runner, _log) = ScriptedRunner::succeed_all();
    let index = StaticIndex::unreachable();

    let name = PackageResolver::new(&runner, &index, NS)
        .resolve("https://github.com/acme/tool.git")
        .unwrap();

    assert_eq!(name, "@modelcontextprotocol/tool");
}

#[test]
fn non_github_url_uses_last_segment() {
    let (runner, _log) = ScriptedRunner::succeed_all();
    let index = StaticIndex::empty();

    let name = PackageResolver::new(&runner, &index, NS)
        .resolve("https://gitlab.com/group/sub/tool.git")
        .unwrap();

    assert_eq!(name, "@modelcontextprotocol/tool");
}

#[test]
fn url_without_path_is_invalid() {
    let (runner, log) = ScriptedRunner::succeed_all();
    let index = StaticIndex::empty();
    let resolver = PackageResolver::new(&runner, &index, NS);

    let err = resolver.resolve("https://example.com/").unwrap_err();
    assert!(matches!(err, McpiError::InvalidRepoUrl(_)));

    let err = resolver.resolve("   ").unwrap_err();
    assert!(matches!(err, McpiError::InvalidRepoUrl(_)));
    assert_eq!(log.commands().len(), 1);
}
