//! Request key derivation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// The key covers the method, the canonical URL and an optional vary
/// string; callers that don't vary on headers pass `""`.
pub fn compute_request_key(method: &str, url: &str, vary: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(vary.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let a = compute_request_key("GET", "https://shop.example/api/products", "");
        let b = compute_request_key("GET", "https://shop.example/api/products", "");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_method_case_insensitive() {
        let upper = compute_request_key("GET", "https://shop.example/", "");
        let lower = compute_request_key("get", "https://shop.example/", "");
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_key_differs_by_method_and_url() {
        let get = compute_request_key("GET", "https://shop.example/cart", "");
        let head = compute_request_key("HEAD", "https://shop.example/cart", "");
        let other = compute_request_key("GET", "https://shop.example/cart?page=2", "");
        assert_ne!(get, head);
        assert_ne!(get, other);
    }

    #[test]
    fn test_key_format() {
        let key = compute_request_key("GET", "https://shop.example/", "");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
