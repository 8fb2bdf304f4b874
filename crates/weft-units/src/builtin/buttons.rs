use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use weft_core::error::Result;
use weft_core::traits::Unit;

/// Interactive approval step: mints one callback token per configured
/// button so a downstream surface can render them and wire replies
/// back into later workflow runs.
pub struct ApprovalButtonsUnit;

impl Unit for ApprovalButtonsUnit {
    fn id(&self) -> &str {
        "approval_buttons"
    }

    fn execute(&self, inputs: Value, _config: Value) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let mut output = Map::new();

            let buttons = inputs
                .get("buttons")
                .and_then(|b| b.as_array())
                .cloned()
                .unwrap_or_default();

            for entry in &buttons {
                // Entries are either a bare id string or {id, label}
                let id = match entry {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(obj) => obj
                        .get("id")
                        .or_else(|| obj.get("label"))
                        .and_then(|v| v.as_str())
                        .map(String::from),
                    _ => None,
                };
                let Some(id) = id.filter(|s| !s.is_empty()) else {
                    continue;
                };
                output.insert(id, Value::String(Uuid::new_v4().to_string()));
            }

            debug!(buttons = output.len(), "Minted approval button tokens");
            Ok(Value::Object(output))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_buttons_from_strings() {
        let out = ApprovalButtonsUnit
            .execute(json!({"buttons": ["approve", "reject"]}), Value::Null)
            .await
            .unwrap();

        let map = out.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert!(map["approve"].as_str().unwrap().len() > 10);
        assert_ne!(map["approve"], map["reject"]);
    }

    #[tokio::test]
    async fn test_buttons_from_objects() {
        let out = ApprovalButtonsUnit
            .execute(
                json!({"buttons": [{"id": "yes", "label": "Approve"}, {"label": "Deny"}]}),
                Value::Null,
            )
            .await
            .unwrap();

        let map = out.as_object().unwrap();
        assert!(map.contains_key("yes"));
        assert!(map.contains_key("Deny"));
    }

    #[tokio::test]
    async fn test_no_buttons_yields_empty_output() {
        let out = ApprovalButtonsUnit
            .execute(json!({}), Value::Null)
            .await
            .unwrap();
        assert_eq!(out, json!({}));
    }
}
