//! API endpoint discovery.
//!
//! Several code-hosting APIs (or mirrors) may serve the same repository. The
//! first candidate that answers `GET <base>repos/<owner>/<name>` with a
//! success status is used for every later request of that resolution.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use clib_schema::RepoKey;
use reqwest::Client;

/// Probe `candidates` in order and return the first base URL that answers.
///
/// Any non-success response, network failure included, moves on to the next
/// candidate. Returns `None` when there are no candidates or all fail.
pub async fn discover(
    client: &Client,
    owner: &str,
    name: &str,
    candidates: &[String],
) -> Option<String> {
    for base in candidates {
        let url = format!("{base}repos/{owner}/{name}");
        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("using api endpoint {base} for {owner}/{name}");
                return Some(base.clone());
            }
            Ok(response) => tracing::debug!("probe {url} -> {}", response.status()),
            Err(e) => tracing::debug!("probe {url} failed: {e}"),
        }
    }
    None
}

/// Endpoint discovery with an optional process-lifetime cache.
///
/// Only successful probes are cached; a repository that no candidate serves
/// is probed again on the next request.
#[derive(Debug, Clone)]
pub struct EndpointDiscovery {
    client: Client,
    candidates: Arc<[String]>,
    cache: Option<Arc<Mutex<HashMap<RepoKey, String>>>>,
}

impl EndpointDiscovery {
    pub fn new(client: Client, candidates: Vec<String>, cache: bool) -> Self {
        Self {
            client,
            candidates: candidates.into(),
            cache: cache.then(Default::default),
        }
    }

    pub async fn discover(&self, owner: &str, name: &str) -> Option<String> {
        let key = RepoKey::new(owner, name);
        if let Some(hit) = self.cached(&key) {
            tracing::trace!("cached api endpoint {hit} for {key}");
            return Some(hit);
        }

        let found = discover(&self.client, owner, name, &self.candidates).await?;
        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.lock() {
                cache.insert(key, found.clone());
            }
        }
        Some(found)
    }

    fn cached(&self, key: &RepoKey) -> Option<String> {
        let cache = self.cache.as_ref()?.lock().ok()?;
        cache.get(key).cloned()
    }
}
