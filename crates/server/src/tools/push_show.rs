//! push_show tool implementation.
//!
//! Displays an inbound push payload as a notification.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storecache_client::{Notifier, PushPayload};

/// Parameters for the push_show tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushShowParams {
    /// Raw push payload: JSON `{title, body, icon?, url?}` or plain text.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Implementation of the push_show tool.
pub fn show_impl(notifier: &dyn Notifier, params: PushShowParams) -> Result<CallToolResult, McpError> {
    let notification = notifier.show(PushPayload::parse(params.payload.as_deref()));
    super::json_result(&notification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_text;
    use storecache_client::TracingNotifier;

    #[test]
    fn test_show_impl() {
        let params = PushShowParams { payload: Some(r#"{"title":"Back in stock","body":"Mangoes"}"#.into()) };
        let result = show_impl(&TracingNotifier, params).unwrap();
        let shown: serde_json::Value = serde_json::from_str(&result_text(&result)).unwrap();
        assert_eq!(shown["title"], "Back in stock");
        assert_eq!(shown["body"], "Mangoes");
    }

    #[test]
    fn test_show_impl_without_payload() {
        let result = show_impl(&TracingNotifier, PushShowParams { payload: None }).unwrap();
        let shown: serde_json::Value = serde_json::from_str(&result_text(&result)).unwrap();
        assert_eq!(shown["title"], "Storefront");
    }
}
