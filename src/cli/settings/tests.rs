use super::helpers::parse_bool;
use super::*;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn set(key: &str, values: &[&str], config: &mut Config) -> Result<String, SettingError> {
    let registry = SettingRegistry::new();
    let handler = registry.get(key).expect("registered key");
    handler.set(&args(values), config)
}

#[test]
fn registry_lists_every_key_once_in_display_order() {
    let registry = SettingRegistry::new();
    assert_eq!(
        registry.keys_display_order(),
        &[
            "backend-url",
            "listen",
            "request-timeout",
            "theme",
            "markdown",
            "syntax",
            "typing-animation",
        ]
    );
    for key in registry.keys_display_order() {
        assert_eq!(registry.get(key).map(|h| h.key()), Some(*key));
    }
    assert!(registry.get("backend_url").is_some());
    assert!(registry.get("default-model").is_none());
}

#[test]
fn backend_url_is_validated_and_normalized() {
    let mut config = Config::default();
    let message = set("backend-url", &["https://astro.example.com/api/"], &mut config)
        .expect("valid url");
    assert_eq!(
        config.backend_url.as_deref(),
        Some("https://astro.example.com/api")
    );
    assert!(message.contains("https://astro.example.com/api"));

    let err = set("backend-url", &["astro.example.com"], &mut config).unwrap_err();
    assert!(matches!(err, SettingError::InvalidValue { key: "backend-url", .. }));
    assert_eq!(
        config.backend_url.as_deref(),
        Some("https://astro.example.com/api")
    );
}

#[test]
fn listen_requires_a_socket_address() {
    let mut config = Config::default();
    set("listen", &["0.0.0.0:8080"], &mut config).expect("valid address");
    assert_eq!(config.listen.as_deref(), Some("0.0.0.0:8080"));
    assert_eq!(config.listen_address(), "0.0.0.0:8080");

    assert!(set("listen", &["localhost"], &mut config).is_err());
}

#[test]
fn request_timeout_accepts_positive_seconds() {
    let mut config = Config::default();
    set("request-timeout", &["45s"], &mut config).expect("valid timeout");
    assert_eq!(config.request_timeout_secs, Some(45));

    for bad in ["0", "-3", "soon"] {
        assert!(
            set("request-timeout", &[bad], &mut config).is_err(),
            "{bad} should be rejected"
        );
    }
    assert_eq!(config.request_timeout_secs, Some(45));
}

#[test]
fn theme_must_be_known() {
    let mut config = Config::default();
    set("theme", &["Light"], &mut config).expect("known theme");
    assert_eq!(config.theme.as_deref(), Some("light"));

    let err = set("theme", &["sepia"], &mut config).unwrap_err();
    assert!(matches!(err, SettingError::UnknownTheme { .. }));
}

#[test]
fn boolean_settings_parse_on_off_words() {
    let mut config = Config::default();
    set("markdown", &["off"], &mut config).expect("bool");
    set("syntax", &["NO"], &mut config).expect("bool");
    set("typing-animation", &["false"], &mut config).expect("bool");
    assert!(!config.markdown_enabled());
    assert!(!config.syntax_enabled());
    assert!(!config.typing_animation_enabled());

    let err = set("markdown", &["maybe"], &mut config).unwrap_err();
    assert!(matches!(err, SettingError::InvalidBoolean(_)));
    assert_eq!(parse_bool(" On "), Some(true));
}

#[test]
fn missing_values_explain_usage() {
    let mut config = Config::default();
    let err = set("theme", &[], &mut config).unwrap_err();
    assert!(matches!(err, SettingError::MissingArgs { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn unset_restores_defaults() {
    let registry = SettingRegistry::new();
    let mut config = Config {
        backend_url: Some("http://astro:8000".into()),
        typing_animation: Some(false),
        ..Default::default()
    };

    let message = registry
        .get("backend-url")
        .expect("handler")
        .unset(&mut config)
        .expect("unset");
    assert!(message.contains("http://localhost:8000"));
    registry
        .get("typing-animation")
        .expect("handler")
        .unset(&mut config)
        .expect("unset");
    assert_eq!(config, Config::default());
}

#[test]
fn describe_all_shows_values_and_defaults() {
    let registry = SettingRegistry::new();
    let config = Config {
        theme: Some("light".into()),
        markdown: Some(false),
        ..Default::default()
    };
    let lines = describe_all(&registry, &config);
    assert_eq!(lines.len(), 7);
    assert!(lines.contains(&"  theme: light".to_string()));
    assert!(lines.contains(&"  markdown: off".to_string()));
    assert!(lines.contains(&"  syntax: (unset, default: on)".to_string()));
}

#[test]
fn unknown_keys_are_rejected_before_touching_config() {
    let registry = SettingRegistry::new();
    let err = apply_set(&registry, "ayanamsha", &args(&["lahiri"])).unwrap_err();
    assert!(matches!(err, SettingError::UnknownKey(key) if key == "ayanamsha"));
    let err = apply_unset(&registry, "ayanamsha").unwrap_err();
    assert!(matches!(err, SettingError::UnknownKey(_)));
}

#[test]
fn handler_errors_survive_the_config_round_trip() {
    let registry = SettingRegistry::new();
    let err = apply_set(&registry, "markdown", &args(&["sometimes"])).unwrap_err();
    assert!(matches!(err, SettingError::InvalidBoolean(value) if value == "sometimes"));
}

struct ConfigPathGuard;

impl Drop for ConfigPathGuard {
    fn drop(&mut self) {
        Config::clear_test_config_override();
    }
}

#[test]
fn rejected_values_leave_the_config_file_untouched() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let path = dir.path().join("config.toml");
    Config::set_test_config_path(path.clone());
    let _guard = ConfigPathGuard;
    let registry = SettingRegistry::new();

    apply_set(&registry, "markdown", &args(&["off"])).expect("valid set");
    let saved = std::fs::read_to_string(&path).expect("config written");
    assert_eq!(Config::load_from_path(&path).expect("parse").markdown, Some(false));

    let err = apply_set(&registry, "markdown", &args(&["sometimes"])).unwrap_err();
    assert!(matches!(err, SettingError::InvalidBoolean(_)));
    assert!(apply_set(&registry, "listen", &args(&["nowhere"])).is_err());
    assert_eq!(std::fs::read_to_string(&path).expect("config kept"), saved);

    apply_set(&registry, "theme", &args(&["light"])).expect("valid set");
    let updated = Config::load_from_path(&path).expect("parse");
    assert_eq!(updated.markdown, Some(false));
    assert_eq!(updated.theme.as_deref(), Some("light"));
}
