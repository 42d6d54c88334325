use std::collections::HashMap;

use super::*;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_apply_when_only_key_is_set() {
    let cfg = AssistantConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
    assert_eq!(cfg.api_key, "sk-test");
    assert_eq!(cfg.base_url, DEFAULT_OPENAI_BASE_URL);
    assert_eq!(cfg.model, "gpt-3.5-turbo");
    assert_eq!(cfg.poll, PollPolicy::default());
    assert_eq!(cfg.poll.interval, Duration::from_secs(5));
    assert_eq!(cfg.poll.timeout, Duration::from_secs(30));
}

#[test]
fn missing_key_is_reported() {
    let err = AssistantConfig::from_lookup(lookup(&[])).unwrap_err();
    assert!(matches!(err, AssistantError::MissingApiKey { ref var } if var == "OPENAI_API_KEY"));
}

#[test]
fn blank_key_counts_as_missing() {
    let err = AssistantConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
    assert!(matches!(err, AssistantError::MissingApiKey { .. }));
}

#[test]
fn overrides_are_parsed() {
    let cfg = AssistantConfig::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_BASE_URL", "https://proxy.test/v1/"),
        ("ASSISTANT_MODEL", "gpt-4o-mini"),
        ("ASSISTANT_POLL_INTERVAL_SECS", "2"),
        ("ASSISTANT_POLL_TIMEOUT_SECS", "12"),
        ("ASSISTANT_REQUEST_TIMEOUT_SECS", "15"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "https://proxy.test/v1");
    assert_eq!(cfg.model, "gpt-4o-mini");
    assert_eq!(cfg.poll.interval, Duration::from_secs(2));
    assert_eq!(cfg.poll.timeout, Duration::from_secs(12));
    assert_eq!(cfg.timeouts, HttpTimeouts { request_secs: 15, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS });
}

#[test]
fn malformed_interval_errors() {
    let err = AssistantConfig::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("ASSISTANT_POLL_INTERVAL_SECS", "soon"),
    ]))
    .unwrap_err()
    .to_string();
    assert!(err.contains("ASSISTANT_POLL_INTERVAL_SECS"));
}

#[test]
fn zero_interval_is_rejected() {
    let err = AssistantConfig::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("ASSISTANT_POLL_INTERVAL_SECS", "0"),
    ]))
    .unwrap_err();
    assert!(matches!(err, AssistantError::ConfigParse(_)));
}
