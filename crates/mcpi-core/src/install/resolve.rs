//! Repository URL → installable package identifier.
//!
//! Tried in order until one yields a name:
//! 1. `npm view <url> name`
//! 2. index lookup by GitHub `owner/repo`, then by `/<repo>` name suffix
//! 3. `<namespace>/<repo>` for GitHub URLs
//! 4. `<namespace>/<last path segment>` for anything else

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::discovery::PackageIndex;
use crate::error::{McpiError, McpiResult};
use crate::process::{CommandSpec, ProcessRunner};

static GITHUB_REPO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)github\.com[/:]([^/:\s]+)/([^/\s#?]+)").expect("valid GitHub pattern")
});

/// `owner` and `repo` of a GitHub URL (`.git` suffix removed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
}

impl GitHubRepo {
    pub fn parse(url: &str) -> Option<Self> {
        let caps = GITHUB_REPO.captures(url)?;
        let owner = caps.get(1)?.as_str().to_string();
        let repo = strip_git_suffix(caps.get(2)?.as_str()).to_string();
        if repo.is_empty() {
            return None;
        }
        Some(Self { owner, repo })
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn strip_git_suffix(segment: &str) -> &str {
    segment.strip_suffix(".git").unwrap_or(segment)
}

/// Last non-empty path segment of a repository URL without `.git`.
///
/// Accepts regular URLs as well as scp-style `git@host:owner/repo.git`.
pub fn last_path_segment(repo_url: &str) -> Option<String> {
    let trimmed = repo_url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let segment = match Url::parse(trimmed) {
        Ok(url) if url.has_host() => url
            .path_segments()?
            .filter(|s| !s.is_empty())
            .last()?
            .to_string(),
        _ => trimmed
            .trim_end_matches('/')
            .rsplit(['/', ':'])
            .next()?
            .to_string(),
    };

    let segment = strip_git_suffix(&segment).trim().to_string();
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(segment)
}

/// Resolves repository URLs to package identifiers.
pub struct PackageResolver<'a> {
    runner: &'a dyn ProcessRunner,
    index: &'a dyn PackageIndex,
    namespace: &'a str,
}

impl<'a> PackageResolver<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        index: &'a dyn PackageIndex,
        namespace: &'a str,
    ) -> Self {
        Self {
            runner,
            index,
            namespace,
        }
    }

    pub fn resolve(&self, repo_url: &str) -> McpiResult<String> {
        let repo_url = repo_url.trim();

        if !repo_url.is_empty() {
            if let Some(name) = self.ask_npm(repo_url) {
                debug!("npm resolved {} to {}", repo_url, name);
                return Ok(name);
            }
        }

        if let Some(github) = GitHubRepo::parse(repo_url) {
            if let Some(name) = self.search_index(&github) {
                debug!("Index resolved {} to {}", github.path(), name);
                return Ok(name);
            }
            return Ok(format!("{}/{}", self.namespace, github.repo));
        }

        last_path_segment(repo_url)
            .map(|segment| format!("{}/{}", self.namespace, segment))
            .ok_or_else(|| McpiError::InvalidRepoUrl(repo_url.to_string()))
    }

    fn ask_npm(&self, repo_url: &str) -> Option<String> {
        let spec = CommandSpec::new("npm", ["view", repo_url, "name"]);
        match self.runner.run(&spec) {
            Ok(output) if output.succeeded() => {
                let name = output.stdout.trim();
                (!name.is_empty()).then(|| name.to_string())
            }
            Ok(output) => {
                debug!("npm view failed: {}", output.failure_detail());
                None
            }
            Err(e) => {
                debug!("npm view could not start: {}", e);
                None
            }
        }
    }

    fn search_index(&self, github: &GitHubRepo) -> Option<String> {
        let packages = match self.index.list(self.namespace) {
            Ok(packages) => packages,
            Err(e) => {
                warn!("Package index lookup failed: {:#}", e);
                return None;
            }
        };

        let path = github.path().to_lowercase();
        let by_repo = packages.iter().find(|p| {
            p.repository
                .as_deref()
                .is_some_and(|r| r.to_lowercase().contains(&path))
        });
        let suffix = format!("/{}", github.repo);
        by_repo
            .or_else(|| packages.iter().find(|p| p.name.ends_with(&suffix)))
            .map(|p| p.name.clone())
    }
}
