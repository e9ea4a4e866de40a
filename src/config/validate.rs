// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{JestLspError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::JestLspError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_runner(&raw)?;
        validate_diagnostics(&raw)?;

        let timeout = match raw.runner.timeout.as_deref() {
            Some(s) => Some(parse_duration(s).map_err(|e| {
                JestLspError::ConfigError(format!("[runner].timeout: {e}"))
            })?),
            None => None,
        };

        let debounce = parse_duration(&raw.validation.debounce).map_err(|e| {
            JestLspError::ConfigError(format!("[validation].debounce: {e}"))
        })?;

        if timeout.is_some_and(|t| t.is_zero()) {
            return Err(JestLspError::ConfigError(
                "[runner].timeout must be greater than zero".to_string(),
            ));
        }

        Ok(ConfigFile::new_unchecked(raw, timeout, debounce))
    }
}

fn validate_runner(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runner.command.trim().is_empty() {
        return Err(JestLspError::ConfigError(
            "[runner].command must not be empty".to_string(),
        ));
    }

    if let Some(path) = &cfg.runner.binary_override_path {
        if path.as_os_str().is_empty() {
            return Err(JestLspError::ConfigError(
                "[runner].binary_override_path must not be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_diagnostics(cfg: &RawConfigFile) -> Result<()> {
    if cfg.diagnostics.end_column == 0 {
        return Err(JestLspError::ConfigError(
            "[diagnostics].end_column must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.diagnostics.source.trim().is_empty() {
        return Err(JestLspError::ConfigError(
            "[diagnostics].source must not be empty".to_string(),
        ));
    }

    Ok(())
}
