//! npm registry implementation of [`PackageIndex`].
//!
//! Lists a scope through the search endpoint, then optionally reads each
//! package document for its README and repository link. [`PackageIndex::list`]
//! never reads the documents.

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{IndexPackage, PackageIndex};
use crate::config::Settings;

const SEARCH_PAGE_SIZE: usize = 250;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    objects: Vec<SearchObject>,
}

#[derive(Debug, Deserialize)]
struct SearchObject {
    package: SearchPackage,
}

#[derive(Debug, Deserialize)]
struct SearchPackage {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    links: SearchLinks,
}

#[derive(Debug, Default, Deserialize)]
struct SearchLinks {
    #[serde(default)]
    repository: Option<String>,
}

/// Subset of an npm package document ("packument").
#[derive(Debug, Deserialize)]
struct PackageDocument {
    #[serde(default)]
    readme: Option<String>,
    #[serde(default)]
    repository: Option<RepositoryField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepositoryField {
    Url(String),
    Object { url: String },
}

/// Package index backed by an npm-compatible registry.
pub struct NpmIndex {
    base_url: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    fetch_readmes: bool,
}

impl NpmIndex {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mcpi/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        // Callers are synchronous; drive requests on a private runtime
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        Ok(Self {
            base_url: settings.index_url.clone(),
            client,
            runtime,
            fetch_readmes: settings.fetch_readmes,
        })
    }

    async fn search_scope(
        &self,
        namespace: &str,
        with_documents: bool,
    ) -> anyhow::Result<Vec<IndexPackage>> {
        let scope = namespace.trim_start_matches('@');
        let url = format!("{}/-/v1/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("text", format!("scope:{}", scope)),
                ("size", SEARCH_PAGE_SIZE.to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to query {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Package index returned HTTP {} for {}",
                response.status(),
                url
            );
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse package search response")?;

        let mut packages = Vec::with_capacity(body.objects.len());
        for object in body.objects {
            let pkg = object.package;
            let mut package = IndexPackage {
                name: pkg.name,
                description: pkg.description,
                keywords: pkg.keywords,
                repository: pkg.links.repository.map(|r| normalize_repo_url(&r)),
                readme: None,
            };

            if with_documents {
                match self.fetch_document(&package.name).await {
                    Ok(doc) => apply_document(&mut package, doc),
                    Err(e) => warn!("Skipping README for {}: {:#}", package.name, e),
                }
            }
            packages.push(package);
        }

        debug!("Index returned {} packages for {}", packages.len(), namespace);
        Ok(packages)
    }

    async fn fetch_document(&self, name: &str) -> anyhow::Result<PackageDocument> {
        // Scoped names keep their '@' but the slash must be escaped
        let url = format!("{}/{}", self.base_url, name.replace('/', "%2F"));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP {} from {}", response.status(), url);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse package document for {}", name))
    }
}

impl PackageIndex for NpmIndex {
    fn search(&self, namespace: &str) -> anyhow::Result<Vec<IndexPackage>> {
        self.runtime
            .block_on(self.search_scope(namespace, self.fetch_readmes))
    }

    fn list(&self, namespace: &str) -> anyhow::Result<Vec<IndexPackage>> {
        self.runtime.block_on(self.search_scope(namespace, false))
    }
}

fn apply_document(package: &mut IndexPackage, doc: PackageDocument) {
    package.readme = doc.readme.filter(|r| !r.trim().is_empty());

    if package.repository.is_none() {
        package.repository = doc.repository.map(|r| match r {
            RepositoryField::Url(url) | RepositoryField::Object { url } => normalize_repo_url(&url),
        });
    }
}

/// Normalize npm repository links to plain `https://` URLs.
///
/// Handles `git+https://…`, `git://…`, `git+ssh://git@host/…` and
/// `github:owner/repo` shorthands. The `.git` suffix is dropped.
pub fn normalize_repo_url(raw: &str) -> String {
    let mut url = raw.trim().to_string();

    if let Some(rest) = url.strip_prefix("github:") {
        url = format!("https://github.com/{}", rest);
    }
    if let Some(rest) = url.strip_prefix("git+") {
        url = rest.to_string();
    }
    if let Some(rest) = url.strip_prefix("ssh://git@") {
        url = format!("https://{}", rest);
    } else if let Some(rest) = url.strip_prefix("git://") {
        url = format!("https://{}", rest);
    }
    if let Some(rest) = url.strip_suffix(".git") {
        url = rest.to_string();
    }
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_repo_url_variants() {
        assert_eq!(
            normalize_repo_url("git+https://github.com/modelcontextprotocol/servers.git"),
            "https://github.com/modelcontextprotocol/servers"
        );
        assert_eq!(
            normalize_repo_url("git://github.com/acme/tool.git"),
            "https://github.com/acme/tool"
        );
        assert_eq!(
            normalize_repo_url("git+ssh://git@github.com/acme/tool.git"),
            "https://github.com/acme/tool"
        );
        assert_eq!(
            normalize_repo_url("github:acme/tool"),
            "https://github.com/acme/tool"
        );
    }

    #[test]
    fn apply_document_fills_readme_and_repository() {
        let doc: PackageDocument = serde_json::from_str(
            r##"{
                "readme": "# Server",
                "dist-tags": {"latest": "1.2.0"},
                "repository": {"type": "git", "url": "git+https://github.com/acme/git.git"}
            }"##,
        )
        .unwrap();

        let mut package = IndexPackage::named("@acme/server-git");
        apply_document(&mut package, doc);

        assert_eq!(package.readme.as_deref(), Some("# Server"));
        assert_eq!(
            package.repository.as_deref(),
            Some("https://github.com/acme/git")
        );
    }

    #[test]
    fn search_response_tolerates_missing_fields() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"objects":[{"package":{"name":"@acme/server-x"}}],"total":1}"#,
        )
        .unwrap();
        assert_eq!(body.objects.len(), 1);
        assert!(body.objects[0].package.links.repository.is_none());
    }
}
