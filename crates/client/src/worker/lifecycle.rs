//! Lifecycle controller.
//!
//! Holds the active dispatcher and at most one waiting dispatcher.
//! Activation takes the active slot exclusively: it waits for in-flight
//! requests on the old version, collects garbage, then swaps. Requests
//! arriving meanwhile wait for the new version.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storecache_core::cache::GcReport;
use storecache_core::cache::entries::RegionInfo;
use storecache_core::{CacheDb, Error, Generation};
use tokio::sync::{Mutex, RwLock};

use super::{Dispatcher, LifecycleState};
use crate::fetch::Network;
use crate::intercept::{InterceptRequest, ResponseSource, Served};

/// Messages the foreground application may post to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Activate the waiting version without waiting for clients to close.
    #[serde(rename = "force-activate", alias = "SKIP_WAITING")]
    ForceActivate,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub generation: Generation,
    pub state: LifecycleState,
}

impl WorkerStatus {
    fn of(dispatcher: &Dispatcher) -> Self {
        Self { generation: dispatcher.generation(), state: dispatcher.state() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationStatus {
    pub active: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    pub regions: Vec<RegionInfo>,
}

pub struct Registration {
    db: CacheDb,
    network: Arc<dyn Network>,
    active: RwLock<Option<Arc<Dispatcher>>>,
    waiting: Mutex<Option<Arc<Dispatcher>>>,
    /// Serializes install and activation.
    lifecycle: Mutex<()>,
}

impl Registration {
    pub fn new(db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self {
            db,
            network,
            active: RwLock::new(None),
            waiting: Mutex::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn network(&self) -> Arc<dyn Network> {
        Arc::clone(&self.network)
    }

    pub async fn active_generation(&self) -> Option<Generation> {
        self.active.read().await.as_ref().map(|d| d.generation())
    }

    /// Install a new version.
    ///
    /// With no active version the new one is activated right away;
    /// otherwise it waits for [`skip_waiting`](Self::skip_waiting). A failed
    /// install leaves the current versions untouched.
    pub async fn install(&self, dispatcher: Dispatcher) -> Result<LifecycleState, Error> {
        let _guard = self.lifecycle.lock().await;
        self.install_locked(dispatcher).await
    }

    /// Bring a version up at startup.
    ///
    /// When nothing is active yet and the static region of this generation
    /// already holds the whole manifest, the version is activated straight
    /// from storage without touching the network. Otherwise this is a
    /// regular [`install`](Self::install).
    pub async fn restore(&self, dispatcher: Dispatcher) -> Result<LifecycleState, Error> {
        let _guard = self.lifecycle.lock().await;

        if self.active.read().await.is_none() {
            let resumed = dispatcher.on_resume().await;
            match resumed {
                Ok(true) => {
                    self.activate(Arc::new(dispatcher)).await?;
                    return Ok(LifecycleState::Active);
                }
                Ok(false) => {}
                Err(err) => tracing::warn!(error = %err, "could not inspect stored precache, installing afresh"),
            }
        }

        self.install_locked(dispatcher).await
    }

    async fn install_locked(&self, dispatcher: Dispatcher) -> Result<LifecycleState, Error> {
        let active = self.active_generation().await;
        if let Some(active) = active
            && dispatcher.generation() <= active
        {
            dispatcher.mark_redundant();
            return Err(Error::InvalidState(format!(
                "generation {} is not newer than active {}",
                dispatcher.generation(),
                active
            )));
        }

        if let Some(waiting) = self.waiting.lock().await.as_deref().map(Dispatcher::generation)
            && dispatcher.generation() <= waiting
        {
            dispatcher.mark_redundant();
            return Err(Error::InvalidState(format!(
                "generation {} is not newer than waiting {}",
                dispatcher.generation(),
                waiting
            )));
        }

        let dispatcher = Arc::new(dispatcher);
        dispatcher.on_install().await?;

        if active.is_none() {
            self.activate(dispatcher).await?;
            return Ok(LifecycleState::Active);
        }

        if let Some(previous) = self.waiting.lock().await.replace(dispatcher) {
            tracing::info!(generation = %previous.generation(), "waiting version superseded");
            previous.mark_redundant();
        }
        Ok(LifecycleState::Waiting)
    }

    /// Activate the waiting version now.
    pub async fn skip_waiting(&self) -> Result<GcReport, Error> {
        let _guard = self.lifecycle.lock().await;

        let waiting = self
            .waiting
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::InvalidState("no waiting version".into()))?;
        self.activate(waiting).await
    }

    /// Handle a message from the control channel.
    pub async fn control(&self, message: ControlMessage) -> Result<GcReport, Error> {
        match message {
            ControlMessage::ForceActivate => self.skip_waiting().await,
        }
    }

    async fn activate(&self, dispatcher: Arc<Dispatcher>) -> Result<GcReport, Error> {
        let mut active = self.active.write().await;
        let report = dispatcher.on_activate().await?;

        if let Some(previous) = active.replace(dispatcher) {
            previous.mark_redundant();
        }
        Ok(report)
    }

    /// Interception point for every outbound request.
    ///
    /// Before any version is active, requests go straight to the network.
    pub async fn handle(&self, request: &InterceptRequest) -> Result<Served, Error> {
        let active = self.active.read().await;
        match active.as_ref() {
            Some(dispatcher) => dispatcher.on_request(request).await,
            None => {
                let response = self.network.fetch(request).await?;
                Ok(Served::new(response, ResponseSource::Passthrough))
            }
        }
    }

    pub async fn status(&self) -> Result<RegistrationStatus, Error> {
        let active = self.active.read().await.as_deref().map(WorkerStatus::of);
        let waiting = self.waiting.lock().await.as_deref().map(WorkerStatus::of);
        let regions = self.db.describe_regions().await?;
        Ok(RegistrationStatus { active, waiting, regions })
    }
}
