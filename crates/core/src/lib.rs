//! Core types and shared functionality for storecache.
//!
//! This crate provides:
//! - Cache Region Store with SQLite backend
//! - Generation garbage collection
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, Generation, RegionKind, RegionName, RegionStore, StoredResponse};
pub use config::AppConfig;
pub use error::Error;
