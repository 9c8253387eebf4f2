use super::types::*;
use crate::config::{expand_env_vars, expand_tilde};
use crate::notify::ChannelKind;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(&yaml_string);

    let mut config: Config = serde_yaml::from_str(&yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        ))
    })?;

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

fn expand_paths(config: &mut Config) {
    config.client.binary = expand_tilde(&config.client.binary);
    config.entities = expand_tilde(&config.entities);
    config.run.log_dir = expand_tilde(&config.run.log_dir);
    config.archive.dir = expand_tilde(&config.archive.dir);
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.run.max_concurrency == 0 {
        errors.push("run.max_concurrency must be at least 1".to_string());
    }

    if config.parser.data_marker.trim().is_empty() {
        errors.push("parser.data_marker must not be empty".to_string());
    }

    let channel_ready = |channel: ChannelKind| match channel {
        ChannelKind::Email => config.notify.email.is_some(),
        ChannelKind::Chat => config.notify.chat.is_some(),
    };

    for (idx, target) in config.notify.targets.iter().enumerate() {
        if target.address.trim().is_empty() {
            errors.push(format!("notify.targets[{}].address must not be empty", idx));
        }
        if target.statuses.is_empty() {
            errors.push(format!(
                "notify.targets[{}] ('{}') routes no statuses",
                idx, target.address
            ));
        }
        if !channel_ready(target.channel) {
            errors.push(format!(
                "notify.targets[{}] ('{}') uses a channel with no transport configured",
                idx, target.address
            ));
        }
    }

    if !channel_ready(config.notify.operator.channel) {
        errors.push("notify.operator uses a channel with no transport configured".to_string());
    }
    if config.notify.operator.address.trim().is_empty() {
        errors.push("notify.operator.address must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
