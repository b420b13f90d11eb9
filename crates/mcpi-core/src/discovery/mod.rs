//! Package discovery.
//!
//! Queries a package index for every package under a namespace, turns the
//! packages into [`ServerRecord`]s and merges them into the registry.
//! Discovery never takes the process down: when the index stays
//! unreachable the registry keeps what was already persisted.

pub mod normalize;
pub mod npm;

use std::time::Duration;

use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{McpiError, McpiResult};
use crate::registry::{PopulateReport, RegistryStore, ServerRecord};

pub use normalize::{normalize, npx_command, server_type};
pub use npm::NpmIndex;

/// A package as reported by the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexPackage {
    pub name: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    /// Repository link, normalized to a plain URL
    pub repository: Option<String>,
    pub readme: Option<String>,
}

impl IndexPackage {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Source of installable packages.
pub trait PackageIndex {
    /// Every package published under `namespace`.
    fn search(&self, namespace: &str) -> anyhow::Result<Vec<IndexPackage>>;

    /// Like [`search`](Self::search), but only what the listing itself
    /// carries. READMEs may be missing. Used for name lookups.
    fn list(&self, namespace: &str) -> anyhow::Result<Vec<IndexPackage>> {
        self.search(namespace)
    }
}

/// Fixed-count, fixed-delay retry policy for index queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

/// Query `index` for `namespace`, retrying per `policy`.
pub fn search_with_retry(
    index: &dyn PackageIndex,
    namespace: &str,
    policy: RetryPolicy,
) -> McpiResult<Vec<IndexPackage>> {
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match index.search(namespace) {
            Ok(packages) => return Ok(packages),
            Err(e) => {
                last_error = format!("{:#}", e);
                warn!(
                    "Package index query for {} failed (attempt {}/{}): {}",
                    namespace, attempt, attempts, last_error
                );
                if attempt < attempts && !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
            }
        }
    }

    Err(McpiError::DiscoveryUnavailable {
        attempts,
        last_error,
    })
}

/// Discover and normalize every server package under `namespace`.
pub fn discover(
    index: &dyn PackageIndex,
    namespace: &str,
    sdk_package: &str,
    policy: RetryPolicy,
) -> McpiResult<Vec<ServerRecord>> {
    let packages = search_with_retry(index, namespace, policy)?;
    Ok(packages
        .into_iter()
        .filter_map(|p| normalize(p, sdk_package))
        .collect())
}

/// Discover servers and merge them into `store`.
pub fn try_populate(
    store: &mut RegistryStore,
    index: &dyn PackageIndex,
    settings: &Settings,
) -> McpiResult<PopulateReport> {
    let records = discover(
        index,
        &settings.namespace,
        &settings.sdk_package(),
        settings.discovery,
    )?;
    store.merge_discovered(records)
}

/// Like [`try_populate`], but failures only degrade to a warning.
pub fn populate(
    store: &mut RegistryStore,
    index: &dyn PackageIndex,
    settings: &Settings,
) -> Option<PopulateReport> {
    match try_populate(store, index, settings) {
        Ok(report) => {
            info!(
                "Registry holds {} servers after discovery",
                store.len()
            );
            Some(report)
        }
        Err(e) => {
            warn!("Discovery skipped: {}", e);
            None
        }
    }
}
