//! Responses generated when neither network nor cache can answer.

use reqwest::StatusCode;
use serde::Serialize;

use crate::fetch::Response;

#[derive(Serialize)]
struct OfflineBody<'a> {
    error: &'a str,
    message: &'a str,
}

/// 503 JSON body for API requests that were never cached.
pub fn api_offline() -> Response {
    let body = OfflineBody { error: "Offline", message: "No network connection available" };
    let json = serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec());
    Response::new(StatusCode::SERVICE_UNAVAILABLE, "application/json", json)
}

/// 503 plain-text body for everything else.
pub fn text_offline() -> Response {
    Response::new(StatusCode::SERVICE_UNAVAILABLE, "text/plain", "Offline")
}
