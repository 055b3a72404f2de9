use std::path::Path;

use crate::config::StackConfig;
use crate::error::ConfigError;
use crate::validate::validate_config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Auto,
}

pub fn parse_config_str(input: &str, format: ConfigFormat) -> Result<StackConfig, ConfigError> {
    match format {
        ConfigFormat::Json => Ok(serde_json::from_str(input)?),
        ConfigFormat::Yaml => Ok(serde_yaml::from_str(input)?),
        ConfigFormat::Auto => parse_config_auto(input),
    }
}

fn parse_config_auto(input: &str) -> Result<StackConfig, ConfigError> {
    // JSON always starts with `{` after trimming; everything else is YAML.
    let trimmed = input.trim_start();
    if trimmed.is_empty() {
        return Ok(StackConfig::default());
    }
    if trimmed.starts_with('{') {
        return match serde_json::from_str(input) {
            Ok(cfg) => Ok(cfg),
            Err(e) => serde_yaml::from_str(input).map_err(|_| ConfigError::Json(e)),
        };
    }
    Ok(serde_yaml::from_str(input)?)
}

/// Loads and validates a config file. `None` yields the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<StackConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let format = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => ConfigFormat::Json,
                Some("yaml") | Some("yml") => ConfigFormat::Yaml,
                _ => ConfigFormat::Auto,
            };
            parse_config_str(&content, format)?
        }
        None => StackConfig::default(),
    };
    validate_config(&config)?;
    Ok(config)
}
