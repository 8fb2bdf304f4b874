pub mod providers;

use weft_core::config::ChatProviderConfig;
use weft_core::error::{Result, WeftError};
use weft_core::traits::ChatClient;

pub use providers::anthropic::AnthropicClient;
pub use providers::openai::OpenAiClient;

/// Create a chat client based on the provider name.
///
/// Unknown providers fall back to the OpenAI-compatible client when a
/// `base_url` is configured, and error otherwise.
pub fn create_client(config: &ChatProviderConfig) -> Result<Box<dyn ChatClient>> {
    match config.provider.as_str() {
        "anthropic" | "claude" => Ok(Box::new(AnthropicClient::new(config))),
        "openai" | "openrouter" | "ollama" => Ok(Box::new(OpenAiClient::new(config))),
        other => {
            if config.base_url.is_some() {
                Ok(Box::new(OpenAiClient::new(config)))
            } else {
                Err(WeftError::UnsupportedProvider(other.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, base_url: Option<&str>) -> ChatProviderConfig {
        ChatProviderConfig {
            provider: provider.into(),
            model_id: "m".into(),
            api_key: Some("k".into()),
            base_url: base_url.map(String::from),
            max_tokens: 256,
            temperature: 0.5,
            timeout_secs: 10,
        }
    }

    #[test]
    fn test_known_providers_resolve() {
        assert!(create_client(&config("anthropic", None)).is_ok());
        assert!(create_client(&config("claude", None)).is_ok());
        assert!(create_client(&config("openai", None)).is_ok());
        assert!(create_client(&config("openrouter", None)).is_ok());
    }

    #[test]
    fn test_unknown_provider_needs_base_url() {
        let err = create_client(&config("homegrown", None)).unwrap_err();
        assert!(matches!(err, WeftError::UnsupportedProvider(_)));

        assert!(create_client(&config("homegrown", Some("http://localhost:8000/v1"))).is_ok());
    }
}
