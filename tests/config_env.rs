// tests/config_env.rs
//
// Settings resolution from file + process environment.
// These tests mutate env vars, so they run serially.

use serial_test::serial;
use std::env;
use std::fs;

use claim_verdict::config::Settings;
use claim_verdict::{AppState, Verifier};

const VARS: &[&str] = &[
    "VERDICT_CONFIG_PATH",
    "ML_SERVICE_URL",
    "ML_CB_THRESHOLD",
    "ML_CB_COOLDOWN_SECONDS",
    "NEWS_API_KEY",
    "BING_API_KEY",
    "TRUSTED_SOURCES_PATH",
    "VERDICT_MAX_CLAIMS",
];

fn clear_env() {
    for v in VARS {
        env::remove_var(v);
    }
}

#[test]
#[serial]
fn file_then_env_overrides() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("verdict.toml");
    fs::write(
        &path,
        r#"
[stance]
ml_service_url = "http://nli.internal:8001"
breaker_threshold = 4

[retrieval]
newsapi_key = "ENV"
bing_key = "ENV"
max_results = 9
"#,
    )
    .unwrap();

    env::set_var("VERDICT_CONFIG_PATH", &path);
    env::set_var("NEWS_API_KEY", "news-key");
    env::set_var("ML_CB_THRESHOLD", "6");
    env::set_var("VERDICT_MAX_CLAIMS", "2");

    let s = Settings::load().unwrap();
    assert_eq!(s.stance.ml_service_url, "http://nli.internal:8001");
    assert_eq!(s.stance.breaker_threshold, 6);
    assert_eq!(s.retrieval.max_results, 9);
    assert_eq!(s.retrieval.newsapi_key.as_deref(), Some("news-key"));
    assert_eq!(s.retrieval.bing_key, None);
    assert_eq!(s.claims.max_claims, 2);

    clear_env();
}

#[test]
#[serial]
fn broken_config_file_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("verdict.toml");
    fs::write(&path, "[stance\nbroken").unwrap();
    env::set_var("VERDICT_CONFIG_PATH", &path);

    assert!(Settings::load().is_err());

    clear_env();
}

#[tokio::test]
#[serial]
async fn settings_wire_a_working_verifier() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let trust = dir.path().join("trusted.json");
    fs::write(&trust, r#"{"high": ["example.org"], "medium": []}"#).unwrap();
    env::set_var("TRUSTED_SOURCES_PATH", &trust);
    env::set_var("ML_SERVICE_URL", "");

    let mut s = Settings::default();
    s.apply_overrides(|k| env::var(k).ok());
    s.retrieval.newsapi_key = None;
    s.retrieval.bing_key = None;
    assert!(!s.stance.remote_enabled());

    let v = Verifier::from_settings(&s).unwrap();
    assert_eq!(v.trust().rank("https://news.example.org/x"), 3);
    assert!(v.breaker().is_some());

    // No provider keys: retrieval is empty, the report still comes back.
    let state = AppState::new(v, 5);
    let r = state
        .verifier
        .verify("Officials announced 40 new buses.", None, Default::default())
        .await;
    assert!(r.evidence.is_empty());
    assert_eq!(r.claim_verdict.evidence_count, 0);

    clear_env();
}
