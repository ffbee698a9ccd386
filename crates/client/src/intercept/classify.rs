//! Request classifier.
//!
//! Pure mapping from a request to an interception decision and a resource
//! class. Rules are applied in order:
//!
//! 1. Only GET is intercepted.
//! 2. Only http and https are intercepted.
//! 3. Bypass hosts (third-party auth) are never intercepted; other
//!    cross-origin requests aren't either.
//! 4. API prefix, then declared destination, decide the class.

use reqwest::Method;
use serde::Serialize;
use storecache_core::{AppConfig, Error, RegionKind};

use super::{Destination, InterceptRequest};

/// Caching category of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Api,
    Image,
    Document,
    StaticAsset,
    Other,
}

impl ResourceClass {
    /// Region that fresh responses of this class are written to.
    pub fn region(self) -> RegionKind {
        match self {
            ResourceClass::Api => RegionKind::Api,
            ResourceClass::StaticAsset => RegionKind::Static,
            ResourceClass::Image | ResourceClass::Document | ResourceClass::Other => RegionKind::Generic,
        }
    }
}

/// Result of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub intercept: bool,
    pub class: ResourceClass,
}

/// Classifier settings, taken from the deployment config.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: url::Origin,
    api_prefix: String,
    bypass_hosts: Vec<String>,
}

impl Classifier {
    pub fn new(origin: &url::Url, api_prefix: impl Into<String>, bypass_hosts: Vec<String>) -> Self {
        Self {
            origin: origin.origin(),
            api_prefix: api_prefix.into(),
            bypass_hosts: bypass_hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(&origin, config.api_prefix.clone(), config.bypass_hosts.clone()))
    }

    fn is_bypass_host(&self, url: &url::Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        self.bypass_hosts
            .iter()
            .any(|bypass| host == bypass || host.strip_suffix(bypass.as_str()).is_some_and(|rest| rest.ends_with('.')))
    }

    fn class_of(&self, request: &InterceptRequest) -> ResourceClass {
        if request.url.path().contains(&self.api_prefix) {
            return ResourceClass::Api;
        }
        match request.destination {
            Destination::Image => ResourceClass::Image,
            Destination::Document => ResourceClass::Document,
            Destination::Script | Destination::Style => ResourceClass::StaticAsset,
            _ => ResourceClass::Other,
        }
    }

    pub fn classify(&self, request: &InterceptRequest) -> Classification {
        let class = self.class_of(request);
        let intercept = request.method == Method::GET
            && matches!(request.url.scheme(), "http" | "https")
            && !self.is_bypass_host(&request.url)
            && request.url.origin() == self.origin;

        Classification { intercept, class }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        let origin = url::Url::parse("https://shop.example").unwrap();
        Classifier::new(&origin, "/api/", vec!["accounts.google.com".into(), "www.facebook.com".into()])
    }

    fn get(url: &str, destination: Destination) -> InterceptRequest {
        InterceptRequest::get(url, destination).unwrap()
    }

    #[test]
    fn test_non_get_is_not_intercepted() {
        let mut request = get("https://shop.example/api/cart", Destination::Empty);
        request.method = Method::POST;
        assert!(!classifier().classify(&request).intercept);
    }

    #[test]
    fn test_foreign_scheme_is_not_intercepted() {
        let request = get("chrome-extension://abcdef/content.js", Destination::Script);
        assert!(!classifier().classify(&request).intercept);
    }

    #[test]
    fn test_cross_origin_is_not_intercepted() {
        let request = get("https://cdn.other.example/app.js", Destination::Script);
        assert!(!classifier().classify(&request).intercept);

        let request = get("http://shop.example/app.js", Destination::Script);
        assert!(!classifier().classify(&request).intercept);
    }

    #[test]
    fn test_bypass_hosts_never_intercepted() {
        let request = get("https://accounts.google.com/o/oauth2/auth", Destination::Document);
        assert!(!classifier().classify(&request).intercept);

        let request = get("https://www.facebook.com/v12.0/dialog/oauth", Destination::Document);
        assert!(!classifier().classify(&request).intercept);

        let origin = url::Url::parse("https://shop.example").unwrap();
        let same_origin_bypass = Classifier::new(&origin, "/api/", vec!["shop.example".into()]);
        let request = get("https://shop.example/", Destination::Document);
        assert!(!same_origin_bypass.classify(&request).intercept);
    }

    #[test]
    fn test_bypass_host_matches_subdomains_only() {
        let c = classifier();
        assert!(c.is_bypass_host(&url::Url::parse("https://eu.accounts.google.com/").unwrap()));
        assert!(!c.is_bypass_host(&url::Url::parse("https://notaccounts.google.com/").unwrap()));
    }

    #[test]
    fn test_classes() {
        let c = classifier();
        let cases = [
            ("https://shop.example/api/products", Destination::Empty, ResourceClass::Api),
            ("https://shop.example/api/products/1/image", Destination::Image, ResourceClass::Api),
            ("https://shop.example/img/hero.jpg", Destination::Image, ResourceClass::Image),
            ("https://shop.example/products/42", Destination::Document, ResourceClass::Document),
            ("https://shop.example/static/js/main.js", Destination::Script, ResourceClass::StaticAsset),
            ("https://shop.example/static/css/main.css", Destination::Style, ResourceClass::StaticAsset),
            ("https://shop.example/fonts/inter.woff2", Destination::Font, ResourceClass::Other),
            ("https://shop.example/manifest.json", Destination::Manifest, ResourceClass::Other),
        ];
        for (url, destination, expected) in cases {
            let classification = c.classify(&get(url, destination));
            assert!(classification.intercept, "{url} should be intercepted");
            assert_eq!(classification.class, expected, "{url}");
        }
    }

    #[test]
    fn test_classify_is_idempotent() {
        let c = classifier();
        let request = get("https://shop.example/api/categories", Destination::Empty);
        assert_eq!(c.classify(&request), c.classify(&request));
    }

    #[test]
    fn test_region_mapping() {
        assert_eq!(ResourceClass::Api.region(), RegionKind::Api);
        assert_eq!(ResourceClass::StaticAsset.region(), RegionKind::Static);
        assert_eq!(ResourceClass::Image.region(), RegionKind::Generic);
        assert_eq!(ResourceClass::Document.region(), RegionKind::Generic);
        assert_eq!(ResourceClass::Other.region(), RegionKind::Generic);
    }
}
