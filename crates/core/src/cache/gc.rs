//! Generation garbage collection.
//!
//! Runs once per activation: every stored region that is not one of the
//! current generation's reserved names is deleted with its entries.

use serde::Serialize;

use super::regions::{RegionName, RegionStore};
use crate::Error;

/// Outcome of one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct GcReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
}

impl RegionStore {
    /// Delete every region not owned by this store's generation.
    ///
    /// Must not run while requests are writing into the regions it removes;
    /// the lifecycle controller only calls it from activation.
    pub async fn collect_garbage(&self) -> Result<GcReport, Error> {
        let expected = self.expected_names();
        let mut report = GcReport::default();

        for name in self.db().list_regions().await? {
            if expected.contains(&name) {
                report.kept.push(name);
                continue;
            }
            if self.db().delete_region(&name).await? {
                let stale = name.parse::<RegionName>().ok().map(|n| n.generation());
                tracing::info!(
                    region = %name,
                    stale_generation = ?stale,
                    generation = %self.generation(),
                    "deleted stale cache region"
                );
                report.deleted.push(name);
            }
        }

        Ok(report)
    }
}
