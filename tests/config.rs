use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use lotto_sync::config::{Config, ConfigLoader};
use lotto_sync::domain::ExitPolicy;
use lotto_sync::error::LottoError;

#[test]
fn parse_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lotto-sync.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "dataset": "app/src/main/assets/draw_kor.csv",
            "url_template": "http://localhost:8080/draw?no={drw_no}",
            "user_agent": "SmartLotto-Updater/1.0",
            "timeout_secs": 5,
            "max_rounds": 3,
            "probe_delay_ms": 1500,
            "exit_policy": "quiet"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();

    assert_eq!(
        resolved.dataset,
        Utf8PathBuf::from("app/src/main/assets/draw_kor.csv")
    );
    assert_eq!(
        resolved.client.url_template,
        "http://localhost:8080/draw?no={drw_no}"
    );
    assert_eq!(resolved.client.user_agent, "SmartLotto-Updater/1.0");
    assert_eq!(resolved.client.timeout, Duration::from_secs(5));
    assert_eq!(resolved.max_rounds, 3);
    assert_eq!(resolved.probe_delay, Duration::from_millis(1500));
    assert_eq!(resolved.exit_policy, ExitPolicy::Quiet);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(LottoError::ConfigRead(_))
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lotto-sync.json");
    fs::write(&path, r#"{"datset": "draw.csv"}"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(LottoError::ConfigParse(_))
    );
}

#[test]
fn template_without_placeholder_is_rejected() {
    let config = Config {
        url_template: Some("https://example.invalid/draw".to_string()),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(LottoError::InvalidUrlTemplate(_))
    );
}

#[test]
fn zero_rounds_and_zero_timeout_are_rejected() {
    let config = Config {
        max_rounds: Some(0),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(LottoError::ConfigParse(_))
    );

    let config = Config {
        timeout_secs: Some(0),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(LottoError::ConfigParse(_))
    );
}
