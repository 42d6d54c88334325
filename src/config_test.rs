use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_when_unset() {
    let config = AppConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config.port, 3000);
    assert_eq!(config.database_url, None);
    assert_eq!(config.db_max_connections, None);
    assert_eq!(config.web_dir, PathBuf::from("web"));
    assert_eq!(config.session_ttl, Duration::from_secs(30 * 86_400));
    assert!(!config.cookie_secure);
}

#[test]
fn reads_every_variable() {
    let config = AppConfig::from_lookup(lookup(&[
        ("PORT", "8080"),
        ("DATABASE_URL", "postgres://localhost/msme"),
        ("DB_MAX_CONNECTIONS", "12"),
        ("WEB_DIR", "/srv/web"),
        ("SESSION_TTL_DAYS", "7"),
        ("COOKIE_SECURE", "Yes"),
    ]))
    .unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/msme"));
    assert_eq!(config.db_max_connections, Some(12));
    assert_eq!(config.web_dir, PathBuf::from("/srv/web"));
    assert_eq!(config.session_ttl, Duration::from_secs(7 * 86_400));
    assert!(config.cookie_secure);
}

#[test]
fn blank_database_url_means_memory_store() {
    let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
    assert_eq!(config.database_url, None);
}

#[test]
fn malformed_values_are_rejected() {
    for (var, value) in [("PORT", "http"), ("DB_MAX_CONNECTIONS", "-1"), ("SESSION_TTL_DAYS", "0"), ("COOKIE_SECURE", "maybe")]
    {
        let err = AppConfig::from_lookup(lookup(&[(var, value)])).unwrap_err();
        assert!(err.to_string().contains(var), "{var}: {err}");
    }
}

#[test]
fn parse_bool_variants() {
    for raw in ["1", "true", " ON "] {
        assert_eq!(parse_bool(raw), Some(true), "{raw}");
    }
    for raw in ["0", "False", "off", "no"] {
        assert_eq!(parse_bool(raw), Some(false), "{raw}");
    }
    assert_eq!(parse_bool(""), None);
}
