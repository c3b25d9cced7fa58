use showcase_slider::config::{Configuration, PrefetchStrategy};
use showcase_slider::tasks::prefetch::IdleStrategy;
use std::time::Duration;

#[test]
fn empty_config_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.api_url, "http://localhost:8080/api");
    assert_eq!(cfg.backend_url, "http://localhost:8080");
    assert!(!cfg.include_inactive);
    assert_eq!(cfg.autoplay_interval, Duration::from_millis(5000));
    assert_eq!(cfg.content_cache_ttl, Duration::from_secs(300));
    assert!((cfg.visibility.threshold - 0.1).abs() < f64::EPSILON);
    assert!((cfg.visibility.root_margin - 50.0).abs() < f64::EPSILON);
    assert_eq!(cfg.prefetch.strategy, PrefetchStrategy::Idle);
    assert_eq!(cfg.prefetch.idle_strategy(), IdleStrategy::Idle);
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
api-url: "https://api.studio.example/api"
backend-url: "https://api.studio.example"
include-inactive: true
request-timeout: 3s
content-cache-ttl: 0s
autoplay-interval: 7500ms
visibility:
  threshold: 0.25
  root-margin: 0
prefetch:
  strategy: delay
  fallback-delay: 150ms
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.showcase_url(), "https://api.studio.example/api/showcase?all=true");
    assert_eq!(cfg.request_timeout, Duration::from_secs(3));
    assert!(cfg.content_cache_ttl.is_zero());
    assert_eq!(cfg.autoplay_interval, Duration::from_millis(7500));
    assert!((cfg.visibility.threshold - 0.25).abs() < f64::EPSILON);
    assert_eq!(
        cfg.prefetch.idle_strategy(),
        IdleStrategy::Delay(Duration::from_millis(150))
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = r#"
api-url: "http://localhost:8080/api"
hover-pause: true
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn validation_rejects_bad_values() {
    let cases = [
        "autoplay-interval: 0s",
        "request-timeout: 0s",
        "backend-url: \"localhost:8080\"",
        "visibility:\n  threshold: 0",
        "visibility:\n  threshold: 1.5",
        "visibility:\n  root-margin: -10",
        "prefetch:\n  fallback-delay: 10s",
    ];
    for yaml in cases {
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validated().is_err(), "accepted invalid config: {yaml}");
    }
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "autoplay-interval: 2s\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.autoplay_interval, Duration::from_secs(2));

    let missing = Configuration::from_yaml_file(dir.path().join("absent.yaml"));
    assert!(missing.is_err());
}
