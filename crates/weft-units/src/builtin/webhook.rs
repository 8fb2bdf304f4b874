use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::traits::Unit;

/// Outbound HTTP step: posts a JSON payload to a configured URL.
pub struct WebhookUnit {
    http: reqwest::Client,
}

impl WebhookUnit {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for WebhookUnit {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct WebhookInput {
    url: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    headers: Option<std::collections::HashMap<String, String>>,
}

impl Unit for WebhookUnit {
    fn id(&self) -> &str {
        "webhook"
    }

    fn execute(&self, inputs: Value, _config: Value) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            let params: WebhookInput =
                serde_json::from_value(inputs.clone()).map_err(|e| WeftError::UnitExecution {
                    unit: "webhook".to_string(),
                    message: format!("invalid inputs: {}", e),
                })?;

            // Default payload: the inputs themselves minus transport fields
            let payload = params.payload.unwrap_or_else(|| {
                let mut body = inputs;
                if let Some(obj) = body.as_object_mut() {
                    obj.remove("url");
                    obj.remove("method");
                    obj.remove("headers");
                }
                body
            });

            let method = params.method.as_deref().unwrap_or("POST").to_uppercase();

            debug!(url = %params.url, method = %method, "Sending webhook");

            let mut req = match method.as_str() {
                "POST" => self.http.post(&params.url),
                "PUT" => self.http.put(&params.url),
                "PATCH" => self.http.patch(&params.url),
                other => {
                    return Err(WeftError::UnitExecution {
                        unit: "webhook".to_string(),
                        message: format!("unsupported method: {}", other),
                    })
                }
            };
            if let Some(headers) = &params.headers {
                for (k, v) in headers {
                    req = req.header(k.as_str(), v.as_str());
                }
            }

            let response = req
                .json(&payload)
                .send()
                .await
                .map_err(|e| WeftError::UnitExecution {
                    unit: "webhook".to_string(),
                    message: format!("request failed: {}", e),
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(WeftError::UnitExecution {
                    unit: "webhook".to_string(),
                    message: format!("HTTP {}: {}", status, body),
                });
            }

            Ok(json!({
                "status": status.as_u16(),
                "ok": true,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_url_is_execution_error() {
        let err = WebhookUnit::new()
            .execute(json!({"payload": {"a": 1}}), Value::Null)
            .await
            .unwrap_err();
        match err {
            WeftError::UnitExecution { unit, message } => {
                assert_eq!(unit, "webhook");
                assert!(message.contains("invalid inputs"));
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_method_rejected() {
        let err = WebhookUnit::new()
            .execute(
                json!({"url": "http://localhost:1/x", "method": "TRACE"}),
                Value::Null,
            )
            .await
            .unwrap_err();
        match err {
            WeftError::UnitExecution { message, .. } => {
                assert!(message.contains("unsupported method"));
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }
}
