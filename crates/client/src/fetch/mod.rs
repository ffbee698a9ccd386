//! Network side of the cache layer.
//!
//! The strategies only see the [`Network`] trait. [`FetchClient`] is the
//! reqwest-backed implementation used by the host; tests substitute a
//! scripted double.
//!
//! A reachable server answering 4xx/5xx is a successful fetch here. Only
//! transport problems (connect, DNS, timeout, oversized body) are errors.

pub mod url;

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use storecache_core::{Error, StoredResponse};

use crate::intercept::InterceptRequest;

pub use url::{UrlError, resolve};

/// A response body with its status line and headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: header::HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Self {
        let mut headers = header::HeaderMap::new();
        if let Ok(value) = header::HeaderValue::from_str(content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Self { status, headers, body: body.into() }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Snapshot this response for storage under `request`.
    pub fn to_stored(&self, request: &InterceptRequest) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        StoredResponse {
            method: request.method.as_str().to_string(),
            url: request.url.to_string(),
            status: self.status.as_u16(),
            headers,
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl TryFrom<StoredResponse> for Response {
    type Error = Error;

    fn try_from(stored: StoredResponse) -> Result<Self, Self::Error> {
        let status = StatusCode::from_u16(stored.status)
            .map_err(|_| Error::InvalidInput(format!("stored status {} is not valid", stored.status)))?;
        let mut headers = header::HeaderMap::with_capacity(stored.headers.len());
        for (name, value) in &stored.headers {
            let (Ok(name), Ok(value)) =
                (header::HeaderName::from_bytes(name.as_bytes()), header::HeaderValue::from_str(value))
            else {
                tracing::debug!(header = %name, url = %stored.url, "skipping unparseable stored header");
                continue;
            };
            headers.append(name, value);
        }
        Ok(Self { status, headers, body: Bytes::from(stored.body) })
    }
}

/// Anything that can carry a request to the backend.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. `Err` means the transport failed; HTTP error
    /// statuses come back as `Ok`.
    async fn fetch(&self, request: &InterceptRequest) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "storecache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 10s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "storecache/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(10_000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &storecache_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP client used for every request that reaches the network.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Transport(err.to_string()) }
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &InterceptRequest) -> Result<Response, Error> {
        let start = Instant::now();

        let mut builder = self.http.request(request.method.clone(), request.url.as_str());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(transport_error)?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "network fetch"
        );

        Ok(Response { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::Destination;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "storecache/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(10_000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = storecache_core::AppConfig { timeout_ms: 2_500, user_agent: "shop/2".into(), ..Default::default() };
        let config = FetchConfig::from_app_config(&app);
        assert_eq!(config.timeout, Duration::from_millis(2_500));
        assert_eq!(config.user_agent, "shop/2");
    }

    #[test]
    fn test_stored_roundtrip_is_byte_identical() {
        let request = InterceptRequest::get("https://shop.example/logo.png", Destination::Image).unwrap();
        let response = Response::new(StatusCode::OK, "image/png", vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a]);

        let stored = response.to_stored(&request);
        assert_eq!(stored.method, "GET");
        assert_eq!(stored.url, "https://shop.example/logo.png");
        assert_eq!(stored.status, 200);

        let restored = Response::try_from(stored).unwrap();
        assert_eq!(restored, response);
    }

    #[test]
    fn test_stored_with_bad_header_is_skipped() {
        let stored = StoredResponse {
            method: "GET".into(),
            url: "https://shop.example/".into(),
            status: 200,
            headers: vec![("bad header".into(), "x".into()), ("x-ok".into(), "1".into())],
            body: b"ok".to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        };
        let restored = Response::try_from(stored).unwrap();
        assert_eq!(restored.headers.len(), 1);
        assert_eq!(restored.headers.get("x-ok").unwrap(), "1");
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }
}
