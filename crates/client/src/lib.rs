//! Client side of storecache.
//!
//! This crate provides the network fetch pipeline, the request classifier
//! and strategy executors, the per-version dispatcher with its lifecycle
//! controller, and the push notification emitter.

pub mod fetch;
pub mod intercept;
pub mod push;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchClient, FetchConfig, Network, Response};
pub use intercept::{
    Classification, Classifier, Destination, InterceptRequest, ResourceClass, ResponseSource, Served, Strategy,
};
pub use push::{Notification, Notifier, PushPayload, TracingNotifier};
pub use worker::{ControlMessage, Dispatcher, LifecycleState, Registration, RegistrationStatus, WorkerStatus};
