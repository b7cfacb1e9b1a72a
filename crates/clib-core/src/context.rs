//! Shared resolution/installation context.
//!
//! This module defines the `Context` struct, which groups the state every
//! resolver and installer task needs, passed down explicitly instead of being
//! reached through globals.

use std::fmt;
use std::sync::Arc;

use clib_schema::Defaults;
use reqwest::Client;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::Config;
use crate::discovery::EndpointDiscovery;
use crate::reporter::Reporter;

/// Groups common state used during resolution and installation.
#[derive(Clone)]
pub struct Context {
    pub client: Client,
    pub config: Arc<Config>,
    pub reporter: Arc<dyn Reporter>,
    pub discovery: EndpointDiscovery,
    /// Emit per-step progress (fetch/save/skip lines, missing-repo warnings).
    pub verbose: bool,
    defaults: Defaults,
    limiter: Option<Arc<Semaphore>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Build a context with a fresh HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(
        config: Config,
        reporter: Arc<dyn Reporter>,
        verbose: bool,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(crate::USER_AGENT).build()?;
        Ok(Self::with_client(client, config, reporter, verbose))
    }

    pub fn with_client(
        client: Client,
        config: Config,
        reporter: Arc<dyn Reporter>,
        verbose: bool,
    ) -> Self {
        let discovery = EndpointDiscovery::new(
            client.clone(),
            config.api_endpoints.clone(),
            config.cache_endpoints,
        );
        let limiter = config
            .max_concurrency
            .map(|permits| Arc::new(Semaphore::new(permits)));
        Self {
            client,
            defaults: config.defaults(),
            config: Arc::new(config),
            reporter,
            discovery,
            verbose,
            limiter,
        }
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Wait for a slot when `max_concurrency` is configured.
    ///
    /// The permit is held for the lifetime of the returned guard.
    pub(crate) async fn permit(&self) -> Option<OwnedSemaphorePermit> {
        let limiter = Arc::clone(self.limiter.as_ref()?);
        limiter.acquire_owned().await.ok()
    }
}
