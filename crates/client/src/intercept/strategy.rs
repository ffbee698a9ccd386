//! Strategy executors.
//!
//! Cache-First serves images and static assets; Network-First serves API
//! calls, documents and everything else. Within one request the steps run
//! strictly in sequence, and dropping the future abandons whatever steps
//! remain.

use storecache_core::{Error, RegionKind, RegionStore};

use super::offline;
use super::{InterceptRequest, ResourceClass, ResponseSource, Served};
use crate::fetch::{Network, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
}

impl Strategy {
    pub fn for_class(class: ResourceClass) -> Self {
        match class {
            ResourceClass::Image | ResourceClass::StaticAsset => Strategy::CacheFirst,
            ResourceClass::Api | ResourceClass::Document | ResourceClass::Other => Strategy::NetworkFirst,
        }
    }
}

/// Keys of the precached stand-ins.
#[derive(Debug, Clone)]
pub struct Fallbacks {
    pub app_shell_key: String,
    pub placeholder_key: String,
}

impl Fallbacks {
    pub fn new(origin: &url::Url, app_shell_path: &str, placeholder_path: &str) -> Result<Self, Error> {
        let key_for = |path: &str| -> Result<String, Error> {
            let url = crate::fetch::resolve(path, origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            Ok(InterceptRequest::new(reqwest::Method::GET, url, Default::default()).cache_key())
        };
        Ok(Self { app_shell_key: key_for(app_shell_path)?, placeholder_key: key_for(placeholder_path)? })
    }
}

/// Runs one strategy against the region store and the network.
pub struct Executor<'a> {
    store: &'a RegionStore,
    network: &'a dyn Network,
    fallbacks: &'a Fallbacks,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a RegionStore, network: &'a dyn Network, fallbacks: &'a Fallbacks) -> Self {
        Self { store, network, fallbacks }
    }

    pub async fn execute(&self, request: &InterceptRequest, class: ResourceClass) -> Result<Served, Error> {
        match Strategy::for_class(class) {
            Strategy::CacheFirst => self.cache_first(request, class).await,
            Strategy::NetworkFirst => Ok(self.network_first(request, class).await),
        }
    }

    /// Stored response for `key`, searching `preferred` first.
    ///
    /// Storage errors count as a miss.
    async fn lookup(&self, key: &str, preferred: RegionKind) -> Option<Response> {
        match self.store.lookup(key, preferred).await {
            Ok(Some((region, stored))) => match Response::try_from(stored) {
                Ok(response) => {
                    tracing::debug!(key, region = region.as_str(), "cache hit");
                    Some(response)
                }
                Err(err) => {
                    tracing::warn!(key, error = %err, "ignoring unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache lookup failed");
                None
            }
        }
    }

    /// Store a fresh 2xx response; anything else is returned uncached.
    async fn write_through(&self, request: &InterceptRequest, key: &str, class: ResourceClass, response: &Response) {
        if !response.status.is_success() {
            tracing::debug!(url = %request.url, status = response.status.as_u16(), "not caching non-success response");
            return;
        }
        if let Err(err) = self.store.put(class.region(), key, &response.to_stored(request)).await {
            tracing::warn!(url = %request.url, error = %err, "cache write failed");
        }
    }

    pub async fn network_first(&self, request: &InterceptRequest, class: ResourceClass) -> Served {
        let key = request.cache_key();

        let err = match self.network.fetch(request).await {
            Ok(response) => {
                self.write_through(request, &key, class, &response).await;
                return Served::new(response, ResponseSource::Network);
            }
            Err(err) => err,
        };

        tracing::debug!(url = %request.url, error = %err, "network failed, trying cache");

        if let Some(stale) = self.lookup(&key, class.region()).await {
            return Served::new(stale, ResponseSource::Cache);
        }

        match class {
            ResourceClass::Api => Served::new(offline::api_offline(), ResponseSource::Synthesized),
            ResourceClass::Document => match self.lookup(&self.fallbacks.app_shell_key, RegionKind::Static).await {
                Some(shell) => Served::new(shell, ResponseSource::Fallback),
                None => Served::new(offline::text_offline(), ResponseSource::Synthesized),
            },
            _ => Served::new(offline::text_offline(), ResponseSource::Synthesized),
        }
    }

    pub async fn cache_first(&self, request: &InterceptRequest, class: ResourceClass) -> Result<Served, Error> {
        let key = request.cache_key();

        if let Some(hit) = self.lookup(&key, class.region()).await {
            return Ok(Served::new(hit, ResponseSource::Cache));
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.write_through(request, &key, class, &response).await;
                Ok(Served::new(response, ResponseSource::Network))
            }
            Err(err) if class == ResourceClass::Image => {
                tracing::debug!(url = %request.url, error = %err, "image unavailable, serving placeholder");
                match self.lookup(&self.fallbacks.placeholder_key, RegionKind::Static).await {
                    Some(placeholder) => Ok(Served::new(placeholder, ResponseSource::Fallback)),
                    None => Ok(Served::new(offline::text_offline(), ResponseSource::Synthesized)),
                }
            }
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "static asset unavailable");
                Err(err)
            }
        }
    }
}
