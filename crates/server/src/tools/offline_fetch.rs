//! offline_fetch tool implementation.
//!
//! Runs one application request through the interception point: the
//! active version's classifier and strategies, or straight to the network
//! when the request is not intercepted.

use reqwest::Method;
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storecache_client::fetch::resolve;
use storecache_client::{Destination, InterceptRequest, Registration, ResponseSource};
use storecache_core::{AppConfig, Error};

/// Input parameters for offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// Absolute URL, or a path resolved against the storefront origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Declared resource type: document, image, script, style, font, manifest.
    #[serde(default)]
    pub destination: Option<String>,

    /// Request body for non-GET requests.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for offline_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct OfflineFetchOutput {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossy for binary content.
    pub body: String,
    pub body_len: usize,
    pub source: ResponseSource,
}

pub(crate) fn build_request(config: &AppConfig, params: OfflineFetchParams) -> Result<InterceptRequest, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
    let url = resolve(&params.url, &origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {}", params.method)))?;
    let destination = params
        .destination
        .as_deref()
        .map(|d| d.parse::<Destination>().unwrap_or_default())
        .unwrap_or_default();

    let request = InterceptRequest::new(method, url, destination);
    Ok(match params.body {
        Some(body) => request.with_body(body),
        None => request,
    })
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl(
    registration: &Registration, config: &AppConfig, params: OfflineFetchParams,
) -> Result<CallToolResult, McpError> {
    let request = build_request(config, params)?;
    let served = registration.handle(&request).await?;
    let response = served.response;

    let output = OfflineFetchOutput {
        url: request.url.to_string(),
        status: response.status.as_u16(),
        content_type: response.content_type().map(str::to_string),
        headers: response
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        body_len: response.body.len(),
        source: served.source,
    };

    super::json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(url: &str, method: &str, destination: Option<&str>) -> OfflineFetchParams {
        OfflineFetchParams {
            url: url.into(),
            method: method.into(),
            destination: destination.map(String::from),
            body: None,
        }
    }

    #[test]
    fn test_build_request_resolves_path() {
        let config = AppConfig { app_origin: "https://shop.example".into(), ..Default::default() };
        let request = build_request(&config, params("/api/products", "get", None)).unwrap();
        assert_eq!(request.url.as_str(), "https://shop.example/api/products");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.destination, Destination::Empty);
    }

    #[test]
    fn test_build_request_destination() {
        let config = AppConfig::default();
        let request = build_request(&config, params("/logo.png", "GET", Some("image"))).unwrap();
        assert_eq!(request.destination, Destination::Image);
    }

    #[test]
    fn test_build_request_empty_url() {
        let config = AppConfig::default();
        assert!(matches!(build_request(&config, params("  ", "GET", None)), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_build_request_invalid_method() {
        let config = AppConfig::default();
        assert!(matches!(build_request(&config, params("/", "GE T", None)), Err(Error::InvalidInput(_))));
    }
}
