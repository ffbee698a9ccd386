//! One deployed version of the cache layer and the controller that
//! swaps versions in.
//!
//! A [`Dispatcher`] owns the three hooks `on_install`, `on_activate` and
//! `on_request`. Each returns the future of its work, and the lifecycle
//! step is not complete until that future resolves. The [`Registration`]
//! wires dispatchers together at startup.

pub mod lifecycle;
pub mod precache;

use std::sync::Arc;

use serde::Serialize;
use storecache_core::cache::GcReport;
use storecache_core::{AppConfig, CacheDb, Error, Generation, RegionStore};
use tokio::sync::watch;

use crate::fetch::{Network, resolve};
use crate::intercept::strategy::Executor;
use crate::intercept::{Classifier, Fallbacks, InterceptRequest, ResponseSource, Served};

pub use lifecycle::{ControlMessage, Registration, RegistrationStatus, WorkerStatus};

/// Lifecycle position of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Active,
    /// Install failed or a newer version took over.
    Redundant,
}

pub struct Dispatcher {
    store: RegionStore,
    network: Arc<dyn Network>,
    classifier: Classifier,
    fallbacks: Fallbacks,
    manifest: Vec<url::Url>,
    state: watch::Sender<LifecycleState>,
}

impl Dispatcher {
    /// Build the dispatcher for `config.generation`.
    pub fn from_config(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let manifest = config
            .precache_manifest
            .iter()
            .map(|path| resolve(path, &origin).map_err(|e| Error::InvalidUrl(format!("{path}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            store: RegionStore::new(db, config.generation),
            network,
            classifier: Classifier::from_config(config)?,
            fallbacks: Fallbacks::new(&origin, &config.app_shell_path, &config.placeholder_image_path)?,
            manifest,
            state: watch::Sender::new(LifecycleState::Installing),
        })
    }

    pub fn generation(&self) -> Generation {
        self.store.generation()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn store(&self) -> &RegionStore {
        &self.store
    }

    fn transition(&self, to: LifecycleState) {
        let from = self.state.send_replace(to);
        if from != to {
            tracing::info!(generation = %self.generation(), ?from, ?to, "lifecycle transition");
        }
    }

    pub(crate) fn mark_redundant(&self) {
        self.transition(LifecycleState::Redundant);
    }

    /// Precache the manifest. Success leaves the dispatcher waiting.
    pub async fn on_install(&self) -> Result<usize, Error> {
        if self.state() != LifecycleState::Installing {
            return Err(Error::InvalidState(format!("cannot install from {:?}", self.state())));
        }

        match precache::precache(&self.store, self.network.as_ref(), &self.manifest).await {
            Ok(count) => {
                self.transition(LifecycleState::Waiting);
                Ok(count)
            }
            Err(err) => {
                tracing::warn!(generation = %self.generation(), error = %err, "install failed");
                self.mark_redundant();
                Err(err)
            }
        }
    }

    /// Reuse the precache an earlier run of this generation left behind.
    ///
    /// Returns `false`, still installing, when the static region is
    /// missing or incomplete; the caller then falls back to
    /// [`on_install`](Self::on_install).
    pub async fn on_resume(&self) -> Result<bool, Error> {
        if self.state() != LifecycleState::Installing {
            return Err(Error::InvalidState(format!("cannot resume from {:?}", self.state())));
        }
        if !precache::is_complete(&self.store, &self.manifest).await? {
            return Ok(false);
        }

        tracing::info!(generation = %self.generation(), entries = self.manifest.len(), "reusing stored precache");
        self.transition(LifecycleState::Waiting);
        Ok(true)
    }

    /// Garbage-collect older generations. Success leaves the dispatcher active.
    pub async fn on_activate(&self) -> Result<GcReport, Error> {
        if self.state() != LifecycleState::Waiting {
            return Err(Error::InvalidState(format!("cannot activate from {:?}", self.state())));
        }
        self.transition(LifecycleState::Activating);

        match self.store.collect_garbage().await {
            Ok(report) => {
                self.transition(LifecycleState::Active);
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(generation = %self.generation(), error = %err, "activation failed");
                self.mark_redundant();
                Err(err)
            }
        }
    }

    /// Serve one request: classify, then run the matching strategy or pass
    /// the request through untouched.
    pub async fn on_request(&self, request: &InterceptRequest) -> Result<Served, Error> {
        let classification = self.classifier.classify(request);
        if !classification.intercept {
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                destination = %request.destination,
                "not intercepted"
            );
            let response = self.network.fetch(request).await?;
            return Ok(Served::new(response, ResponseSource::Passthrough));
        }

        Executor::new(&self.store, self.network.as_ref(), &self.fallbacks)
            .execute(request, classification.class)
            .await
    }
}
