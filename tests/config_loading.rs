use std::io::Write;

use weft_core::config::WeftConfig;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[database]
path = "/tmp/weft-test.db"

[chat]
provider = "anthropic"
model_id = "claude-sonnet-4-20250514"
api_key = "sk-test-key"
max_tokens = 2048
temperature = 0.2

[engine]
unit_timeout_secs = 10
max_error_chars = 200

[gateway]
bind = "0.0.0.0:9999"
token = "test-token"

[[agents]]
id = "triage"
system_prompt = "You triage support tickets."
temperature = 0.1

[[agents]]
id = "summarize"
system_prompt = "Summarize the conversation."
model = "gpt-4o"
timeout_secs = 60
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = WeftConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.database.path, "/tmp/weft-test.db");
    assert_eq!(config.chat.provider, "anthropic");
    assert_eq!(config.chat.model_id, "claude-sonnet-4-20250514");
    assert_eq!(config.chat.api_key, Some("sk-test-key".to_string()));
    assert_eq!(config.chat.max_tokens, 2048);
    assert_eq!(config.engine.unit_timeout_secs, 10);
    assert_eq!(config.engine.max_error_chars, 200);

    let gw = config.gateway.as_ref().expect("gateway present");
    assert_eq!(gw.bind, "0.0.0.0:9999");
    assert_eq!(gw.token, Some("test-token".to_string()));

    assert_eq!(config.agents.len(), 2);
    let triage = config.agent("triage").expect("triage profile");
    assert_eq!(triage.temperature, Some(0.1));
    assert!(triage.model.is_none());
    let summarize = config.agent("summarize").expect("summarize profile");
    assert_eq!(summarize.model, Some("gpt-4o".to_string()));
    assert_eq!(summarize.timeout_secs, Some(60));
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("WEFT_TEST_API_KEY", "expanded-key-value");

    let toml_content = r#"
[chat]
model_id = "test-model"
api_key = "${WEFT_TEST_API_KEY}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = WeftConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.chat.api_key, Some("expanded-key-value".to_string()));

    std::env::remove_var("WEFT_TEST_API_KEY");
}

#[test]
fn test_unset_env_var_is_left_verbatim() {
    let toml_content = r#"
[chat]
model_id = "test-model"
api_key = "${WEFT_DEFINITELY_UNSET_KEY}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = WeftConfig::load(tmp.path()).expect("load config");
    assert_eq!(
        config.chat.api_key,
        Some("${WEFT_DEFINITELY_UNSET_KEY}".to_string())
    );
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml_content = r#"
[chat]
model_id = "llama3.2"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = WeftConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.database.path, "weft.db");
    assert_eq!(config.chat.provider, "anthropic");
    assert_eq!(config.chat.max_tokens, 4096);
    assert_eq!(config.engine.unit_timeout_secs, 30);
    assert_eq!(config.engine.max_error_chars, 500);
    assert!(config.gateway.is_none());
    assert!(config.agents.is_empty());
}

#[test]
fn test_missing_config_file_errors() {
    let err = WeftConfig::load(std::path::Path::new("/nonexistent/weft.toml"))
        .expect_err("missing file should error");
    assert!(err.to_string().contains("/nonexistent/weft.toml"));
}
