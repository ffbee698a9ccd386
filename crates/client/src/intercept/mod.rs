//! Request interception: classification, strategy dispatch and the
//! synthesized responses used when both network and cache come up empty.

pub mod classify;
pub mod offline;
pub mod strategy;

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use storecache_core::Error;
use storecache_core::cache::hash::compute_request_key;

use crate::fetch::Response;

pub use classify::{Classification, Classifier, ResourceClass};
pub use strategy::{Fallbacks, Strategy};

/// Declared resource type of a request, as a browser would report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    #[default]
    Empty,
}

impl FromStr for Destination {
    type Err = std::convert::Infallible;

    /// Unknown destinations map to `Empty`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "image" => Destination::Image,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            _ => Destination::Empty,
        })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
            Destination::Empty => "",
        };
        f.write_str(s)
    }
}

/// An outbound request issued by the application.
#[derive(Debug, Clone)]
pub struct InterceptRequest {
    pub method: Method,
    pub url: url::Url,
    pub destination: Destination,
    pub body: Option<Bytes>,
}

impl InterceptRequest {
    pub fn new(method: Method, url: url::Url, destination: Destination) -> Self {
        Self { method, url, destination, body: None }
    }

    /// A GET for an absolute URL. The fragment is dropped, as in
    /// [`resolve`](crate::fetch::resolve).
    pub fn get(url: &str, destination: Destination) -> Result<Self, Error> {
        let mut url = url::Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        url.set_fragment(None);
        Ok(Self::new(Method::GET, url, destination))
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Key under which this request's response is stored.
    pub fn cache_key(&self) -> String {
        compute_request_key(self.method.as_str(), self.url.as_str(), "")
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Live network response.
    Network,
    /// Stored entry for this exact request.
    Cache,
    /// Stored stand-in: the app shell document or the placeholder image.
    Fallback,
    /// Generated 503 offline response.
    Synthesized,
    /// Request was not intercepted and went straight to the network.
    Passthrough,
}

/// A response together with its provenance.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
}

impl Served {
    pub fn new(response: Response, source: ResponseSource) -> Self {
        Self { response, source }
    }
}
