//! Generation-scoped view over the region store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::connection::CacheDb;
use super::entries::StoredResponse;
use crate::Error;

/// Version token shared by every region of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self(1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The reserved region names of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Runtime responses for documents, images and everything unclassified.
    Generic,
    /// Precached manifest assets plus runtime scripts and styles.
    Static,
    /// Backend API responses.
    Api,
}

impl RegionKind {
    pub const ALL: [RegionKind; 3] = [RegionKind::Generic, RegionKind::Static, RegionKind::Api];

    pub fn as_str(self) -> &'static str {
        match self {
            RegionKind::Generic => "generic",
            RegionKind::Static => "static",
            RegionKind::Api => "api",
        }
    }
}

impl FromStr for RegionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown region kind: {s}")))
    }
}

/// Fully qualified region name, e.g. `static-v2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionName {
    kind: RegionKind,
    generation: Generation,
}

impl RegionName {
    pub const fn new(kind: RegionKind, generation: Generation) -> Self {
        Self { kind, generation }
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.as_str(), self.generation)
    }
}

impl FromStr for RegionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidInput(format!("not a region name: {s}"));
        let (kind, version) = s.rsplit_once("-v").ok_or_else(invalid)?;
        let generation = version.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self { kind: kind.parse()?, generation: Generation::new(generation) })
    }
}

/// Cache Region Store bound to one generation.
///
/// Every read and write goes to the regions of `generation`; other
/// generations are only ever touched by garbage collection.
#[derive(Clone, Debug)]
pub struct RegionStore {
    db: CacheDb,
    generation: Generation,
}

impl RegionStore {
    pub fn new(db: CacheDb, generation: Generation) -> Self {
        Self { db, generation }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Name of this generation's region of the given kind.
    pub fn region(&self, kind: RegionKind) -> RegionName {
        RegionName::new(kind, self.generation)
    }

    /// The full set of region names this generation may own.
    pub fn expected_names(&self) -> Vec<String> {
        RegionKind::ALL.into_iter().map(|kind| self.region(kind).to_string()).collect()
    }

    pub async fn put(&self, kind: RegionKind, key: &str, response: &StoredResponse) -> Result<(), Error> {
        self.db.put_entry(&self.region(kind), key, response).await
    }

    pub async fn put_all(&self, kind: RegionKind, entries: Vec<(String, StoredResponse)>) -> Result<(), Error> {
        self.db.put_entries(&self.region(kind), entries).await
    }

    pub async fn get(&self, kind: RegionKind, key: &str) -> Result<Option<StoredResponse>, Error> {
        self.db.get_entry(&self.region(kind).to_string(), key).await
    }

    /// Find `key` in any region of this generation.
    ///
    /// `preferred` is searched first, then the rest in `Static, Api, Generic`
    /// order. Returns the region the hit came from.
    pub async fn lookup(&self, key: &str, preferred: RegionKind) -> Result<Option<(RegionKind, StoredResponse)>, Error> {
        let order = [preferred, RegionKind::Static, RegionKind::Api, RegionKind::Generic];
        let mut searched = Vec::with_capacity(order.len());
        for kind in order {
            if searched.contains(&kind) {
                continue;
            }
            searched.push(kind);
            if let Some(response) = self.get(kind, key).await? {
                return Ok(Some((kind, response)));
            }
        }
        Ok(None)
    }
}
