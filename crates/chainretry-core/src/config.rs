use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{DefaultClassifier, PolicyTable, RetryPolicy};

/// Invalid values in `config.toml`.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("[retry.{section}] backoff_multiplier must be >= 1.0 (got {value})")]
    MultiplierBelowOne { section: &'static str, value: f64 },
    #[error("[retry.{section}] max_attempts must be > 0")]
    ZeroAttempts { section: &'static str },
    #[error("[retry.{section}] max_delay_ms ({max}) is below initial_delay_ms ({initial})")]
    MaxBelowInitial {
        section: &'static str,
        initial: u64,
        max: u64,
    },
}

/// Backoff parameters for one classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Retries allowed after the first call.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl PolicyConfig {
    fn validate(&self, section: &'static str) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts { section });
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::MultiplierBelowOne {
                section,
                value: self.backoff_multiplier,
            });
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::MaxBelowInitial {
                section,
                initial: self.initial_delay_ms,
                max: self.max_delay_ms,
            });
        }
        Ok(())
    }

    fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            should_retry: true,
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Optional `[retry]` section. Permanent failures have no entry: they are
/// never retried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub retriable: Option<PolicyConfig>,
    #[serde(default)]
    pub degraded: Option<PolicyConfig>,
}

/// Optional `[classifier]` section: markers added to the built-in lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub extra_permanent_markers: Vec<String>,
    #[serde(default)]
    pub extra_degraded_markers: Vec<String>,
}

/// Configuration loaded from `~/.config/chainretry/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainRetryConfig {
    /// If missing, built-in policies are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
}

impl ChainRetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(retry) = &self.retry {
            if let Some(p) = &retry.retriable {
                p.validate("retriable")?;
            }
            if let Some(p) = &retry.degraded {
                p.validate("degraded")?;
            }
        }
        Ok(())
    }

    /// Built-in policies with any configured overrides applied.
    pub fn policy_table(&self) -> Result<PolicyTable, ConfigError> {
        self.validate()?;
        let retry = self.retry.clone().unwrap_or_default();
        let retriable = retry
            .retriable
            .as_ref()
            .map_or_else(RetryPolicy::retriable, PolicyConfig::to_policy);
        let degraded = retry
            .degraded
            .as_ref()
            .map_or_else(RetryPolicy::degraded, PolicyConfig::to_policy);
        Ok(PolicyTable::new(retriable, degraded))
    }

    pub fn classifier(&self) -> DefaultClassifier {
        match &self.classifier {
            Some(c) => DefaultClassifier::new().with_extra_markers(
                c.extra_permanent_markers.iter().cloned(),
                c.extra_degraded_markers.iter().cloned(),
            ),
            None => DefaultClassifier::new(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("chainretry")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load and validate configuration from an explicit path.
pub fn load_from_path(path: &Path) -> Result<ChainRetryConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: ChainRetryConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ChainRetryConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ChainRetryConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}
