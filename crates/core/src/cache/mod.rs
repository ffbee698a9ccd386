//! SQLite-backed Cache Region Store.
//!
//! Cached request/response pairs are grouped into named regions. Every
//! region name carries the generation of the deployment that created it,
//! so a whole deployment's regions can be dropped as a unit.
//!
//! - Request keys derived with SHA-256
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Region-level deletion with cascading entries

pub mod connection;
pub mod entries;
pub mod gc;
pub mod hash;
pub mod migrations;
pub mod regions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredResponse;
pub use gc::GcReport;
pub use regions::{Generation, RegionKind, RegionName, RegionStore};
