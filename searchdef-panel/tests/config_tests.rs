use proptest::prelude::*;
use searchdef_core::NoteId;
use searchdef_panel::config::{AuthConfig, ConfigError, PanelConfig};
use std::io::Write;
use std::time::Duration;

fn base_config() -> PanelConfig {
    PanelConfig {
        api_base_url: "http://localhost:8080/api".to_string(),
        auth: AuthConfig {
            api_key: Some("test-key".to_string()),
            jwt: None,
        },
        request_timeout_ms: 5_000,
        debounce_ms: 2_000,
        log_filter: "info".to_string(),
        note_id: None,
    }
}

#[test]
fn base_config_is_valid() {
    assert!(base_config().validate().is_ok());
    assert_eq!(base_config().debounce(), Duration::from_millis(2_000));
}

#[test]
fn config_requires_auth() {
    let mut config = base_config();
    config.auth = AuthConfig {
        api_key: None,
        jwt: None,
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { field: "auth", .. })
    ));
}

#[test]
fn config_rejects_zero_debounce() {
    let mut config = base_config();
    config.debounce_ms = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue {
            field: "debounce_ms",
            ..
        })
    ));
}

#[test]
fn config_rejects_blank_note_id() {
    let mut config = base_config();
    config.note_id = Some(NoteId::new("  "));
    assert!(config.validate().is_err());
}

#[test]
fn loads_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
api_base_url = "http://notes.local/api"
request_timeout_ms = 3000
debounce_ms = 1500
log_filter = "searchdef_panel=debug"
note_id = "abc123"

[auth]
jwt = "token"
"#
    )
    .unwrap();

    let config = PanelConfig::from_path(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.note_id, Some(NoteId::new("abc123")));
    assert_eq!(config.auth.jwt.as_deref(), Some("token"));
    assert_eq!(config.auth.api_key, None);
    assert_eq!(config.debounce(), Duration::from_millis(1500));
}

#[test]
fn unknown_keys_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
api_base_url = "http://notes.local/api"
request_timeout_ms = 3000
debounce_ms = 1500
log_filter = "info"
theme = "dark"

[auth]
api_key = "k"
"#
    )
    .unwrap();

    assert!(matches!(
        PanelConfig::from_path(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

proptest! {
    #[test]
    fn positive_timings_validate(timeout in 1u64..60_000, debounce in 1u64..10_000) {
        let mut config = base_config();
        config.request_timeout_ms = timeout;
        config.debounce_ms = debounce;
        prop_assert!(config.validate().is_ok());
    }
}
