//! Precache initializer.
//!
//! Fetches every manifest entry and stores them in the static region in
//! one transaction. A single failed entry fails the whole install and
//! nothing is written.

use storecache_core::{Error, RegionKind, RegionStore, StoredResponse};

use crate::fetch::Network;
use crate::intercept::{Destination, InterceptRequest};

/// Guess the destination a browser would report for a manifest path.
fn destination_for(url: &url::Url) -> Destination {
    let path = url.path();
    let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "ico" | "avif") => Destination::Image,
        Some("js" | "mjs") => Destination::Script,
        Some("css") => Destination::Style,
        Some("woff" | "woff2" | "ttf" | "otf") => Destination::Font,
        Some("webmanifest") => Destination::Manifest,
        Some("html" | "htm") => Destination::Document,
        None if path.ends_with('/') => Destination::Document,
        _ => Destination::Empty,
    }
}

fn manifest_request(url: &url::Url) -> InterceptRequest {
    InterceptRequest::new(reqwest::Method::GET, url.clone(), destination_for(url))
}

/// Whether every manifest entry is already in the static region.
pub async fn is_complete(store: &RegionStore, manifest: &[url::Url]) -> Result<bool, Error> {
    for url in manifest {
        if store.get(RegionKind::Static, &manifest_request(url).cache_key()).await?.is_none() {
            tracing::debug!(url = %url, generation = %store.generation(), "stored precache is missing an entry");
            return Ok(false);
        }
    }
    Ok(true)
}

/// Fetch and store the manifest. Returns the number of stored entries.
///
/// # Errors
///
/// Returns `Error::PrecacheFailed` naming the first entry that could not
/// be fetched or answered with a non-2xx status.
pub async fn precache(store: &RegionStore, network: &dyn Network, manifest: &[url::Url]) -> Result<usize, Error> {
    let mut entries: Vec<(String, StoredResponse)> = Vec::with_capacity(manifest.len());

    for url in manifest {
        let request = manifest_request(url);
        let response = network
            .fetch(&request)
            .await
            .map_err(|e| Error::PrecacheFailed { url: url.to_string(), reason: e.to_string() })?;

        if !response.status.is_success() {
            return Err(Error::PrecacheFailed {
                url: url.to_string(),
                reason: format!("status {}", response.status.as_u16()),
            });
        }

        entries.push((request.cache_key(), response.to_stored(&request)));
    }

    let count = entries.len();
    store.put_all(RegionKind::Static, entries).await?;

    tracing::info!(entries = count, region = %store.region(RegionKind::Static), "precache complete");
    Ok(count)
}
