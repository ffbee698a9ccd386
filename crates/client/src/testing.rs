//! Scripted network double shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use storecache_core::{CacheDb, Error, Generation, RegionStore};
use tokio::sync::Notify;

use crate::fetch::{Network, Response};
use crate::intercept::InterceptRequest;

pub(crate) const ORIGIN: &str = "https://shop.example";

pub(crate) fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

/// Serves canned responses by URL; unknown URLs get a 404.
pub(crate) struct MockNetwork {
    routes: Mutex<HashMap<String, Response>>,
    online: AtomicBool,
    calls: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MockNetwork {
    pub(crate) fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn route(&self, path: &str, status: u16, content_type: &str, body: &[u8]) {
        let response = Response::new(StatusCode::from_u16(status).unwrap(), content_type, body.to_vec());
        self.routes.lock().unwrap().insert(url(path), response);
    }

    /// Hold every fetch of `path` until the returned gate is notified.
    pub(crate) fn hold(&self, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(url(path), Arc::clone(&gate));
        gate
    }

    /// Resolves once `path` has been requested at least once.
    pub(crate) async fn requested(&self, path: &str) {
        while self.calls_to(path) == 0 {
            tokio::task::yield_now().await;
        }
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        let target = url(path);
        self.calls.lock().unwrap().iter().filter(|u| **u == target).count()
    }
}

#[async_trait::async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &InterceptRequest) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.url.to_string());
        let gate = self.gates.lock().unwrap().get(request.url.as_str()).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Transport("connection refused".into()));
        }
        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| Response::new(StatusCode::NOT_FOUND, "text/plain", "Not Found")))
    }
}

pub(crate) async fn store(generation: u64) -> RegionStore {
    let db = CacheDb::open_in_memory().await.unwrap();
    RegionStore::new(db, Generation::new(generation))
}
