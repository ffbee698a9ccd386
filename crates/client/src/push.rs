//! Push notification display.
//!
//! Shares the process with the cache layer but nothing else: a push
//! payload is parsed leniently and handed to a [`Notifier`].

use serde::{Deserialize, Serialize};

const DEFAULT_TITLE: &str = "Storefront";
const DEFAULT_BODY: &str = "You have a new notification";

fn default_title() -> String {
    DEFAULT_TITLE.into()
}

fn default_body() -> String {
    DEFAULT_BODY.into()
}

/// Inbound push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Page to open when the notification is clicked.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for PushPayload {
    fn default() -> Self {
        Self { title: default_title(), body: default_body(), icon: None, url: None }
    }
}

impl PushPayload {
    /// Parse a raw payload. Missing or malformed data yields the defaults.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str(raw) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(error = %err, "push payload is not JSON, using it as the body");
                Self { body: raw.to_string(), ..Self::default() }
            }
        }
    }
}

/// A notification as it was shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    pub url: Option<String>,
    pub shown_at: String,
}

pub trait Notifier: Send + Sync {
    fn show(&self, payload: PushPayload) -> Notification;
}

/// Shows notifications as structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, payload: PushPayload) -> Notification {
        let notification = Notification {
            title: payload.title,
            body: payload.body,
            icon: payload.icon,
            url: payload.url,
            shown_at: chrono::Utc::now().to_rfc3339(),
        };
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            url = notification.url.as_deref(),
            "notification shown"
        );
        notification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_payload() {
        let payload = PushPayload::parse(Some(
            r#"{"title":"Order shipped","body":"Order #1042 is on its way","url":"/orders/1042"}"#,
        ));
        assert_eq!(payload.title, "Order shipped");
        assert_eq!(payload.body, "Order #1042 is on its way");
        assert_eq!(payload.url.as_deref(), Some("/orders/1042"));
        assert!(payload.icon.is_none());
    }

    #[test]
    fn test_parse_missing_payload() {
        assert_eq!(PushPayload::parse(None), PushPayload::default());
        assert_eq!(PushPayload::parse(Some("  ")), PushPayload::default());
    }

    #[test]
    fn test_parse_partial_payload() {
        let payload = PushPayload::parse(Some(r#"{"body":"Flash sale"}"#));
        assert_eq!(payload.title, DEFAULT_TITLE);
        assert_eq!(payload.body, "Flash sale");
    }

    #[test]
    fn test_parse_plain_text_payload() {
        let payload = PushPayload::parse(Some("Your cart misses you"));
        assert_eq!(payload.title, DEFAULT_TITLE);
        assert_eq!(payload.body, "Your cart misses you");
    }

    #[test]
    fn test_tracing_notifier_show() {
        let shown = TracingNotifier.show(PushPayload::parse(Some(r#"{"title":"Hi"}"#)));
        assert_eq!(shown.title, "Hi");
        assert_eq!(shown.body, DEFAULT_BODY);
        assert!(!shown.shown_at.is_empty());
    }
}
