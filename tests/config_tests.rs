use std::fs;
use tempfile::TempDir;
use upmon::config::generate::generate_starter_config;
use upmon::config::{load_config, ConfigError};
use upmon::notify::ChannelKind;

#[test]
fn test_generated_config_is_valid() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    fs::write(&config_path, generate_starter_config()).unwrap();

    let config = load_config(&config_path).expect("Generated config should be valid");

    assert_eq!(config.run.max_concurrency, 1);
    assert_eq!(config.run.staleness_window.as_secs(), 23 * 60 * 60);
    assert_eq!(config.parser.severity_column, 2);
    assert_eq!(config.notify.targets.len(), 2);
    assert_eq!(config.notify.operator.channel, ChannelKind::Email);
    assert!(config.notify.email.is_some());
    assert!(config.notify.chat.is_some());
}

#[test]
fn test_target_without_transport_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let yaml = r#"
client:
  binary: /usr/local/bin/mf-client
entities: /etc/upmon/entities.list
run:
  log_dir: /var/log/upmon/runs
archive:
  dir: /var/log/upmon/archive
notify:
  email:
    smtp_host: localhost
    from: upmon@example.org
  targets:
    - channel: chat
      address: '#digest'
      statuses: [clean]
  operator:
    channel: email
    address: dev@example.org
    statuses: [indeterminate]
"#;
    fs::write(&config_path, yaml).unwrap();

    match load_config(&config_path) {
        Err(ConfigError::ValidationList(errors)) => {
            assert!(errors.iter().any(|e| e.contains("no transport configured")));
        }
        other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let yaml = r#"
client:
  binary: /usr/local/bin/mf-client
entities: /etc/upmon/entities.list
run:
  log_dir: /var/log/upmon/runs
  max_concurrency: 0
archive:
  dir: /var/log/upmon/archive
notify:
  email:
    smtp_host: localhost
    from: upmon@example.org
  operator:
    channel: email
    address: dev@example.org
    statuses: [indeterminate]
"#;
    fs::write(&config_path, yaml).unwrap();

    assert!(matches!(
        load_config(&config_path),
        Err(ConfigError::ValidationList(_))
    ));
}

#[test]
fn test_env_vars_are_expanded_in_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    std::env::set_var("UPMON_TEST_FROM", "batch@example.org");
    let yaml = r#"
client:
  binary: /usr/local/bin/mf-client
entities: /etc/upmon/entities.list
run:
  log_dir: /var/log/upmon/runs
archive:
  dir: /var/log/upmon/archive
notify:
  email:
    smtp_host: localhost
    from: $env{UPMON_TEST_FROM}
  operator:
    channel: email
    address: dev@example.org
    statuses: [indeterminate]
"#;
    fs::write(&config_path, yaml).unwrap();

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.notify.email.unwrap().from, "batch@example.org");
}

#[test]
fn test_defaults_fill_optional_sections() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let yaml = r#"
client:
  binary: /usr/local/bin/mf-client
entities: /etc/upmon/entities.list
run:
  log_dir: /var/log/upmon/runs
archive:
  dir: /var/log/upmon/archive
notify:
  chat:
    webhook_url: http://localhost:9999/hook
  operator:
    channel: chat
    address: '#upmon-dev'
    statuses: [indeterminate]
"#;
    fs::write(&config_path, yaml).unwrap();

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.client.timeout.as_secs(), 23 * 60 * 60);
    assert_eq!(config.parser.data_marker, "- creating");
    assert!(config.notify.targets.is_empty());
    assert_eq!(config.notify.chat.unwrap().max_inline_bytes, 3000);
}
