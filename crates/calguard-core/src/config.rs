use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FailureKind;
use crate::messages::Locale;

/// Retry policy parameters (`[retry]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per call (including the first).
    pub max_attempts: u32,
    /// Delay in seconds before the first retry (e.g. 0.5 = 500ms).
    pub initial_delay_secs: f64,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: f64,
    /// Random spread applied to every delay, as a fraction (0.1 = ±10%).
    pub jitter_fraction: f64,
    /// Failure kinds that trigger a retry.
    pub retryable: Vec<FailureKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_secs: 1.0,
            backoff_factor: 2.0,
            jitter_fraction: 0.1,
            retryable: vec![FailureKind::TransientNetwork, FailureKind::QuotaExceeded],
        }
    }
}

/// Performance recorder parameters (`[perf]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfConfig {
    /// Duration samples kept per operation for avg/min/max.
    pub window_capacity: usize,
    /// Calls slower than this many seconds are logged as warnings.
    pub slow_call_threshold_secs: f64,
    /// Operations averaging above this many seconds are flagged in performance reports.
    pub report_threshold_secs: f64,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            window_capacity: 100,
            slow_call_threshold_secs: 5.0,
            report_threshold_secs: 3.0,
        }
    }
}

/// Client pool parameters (`[pool]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_size: usize,
    /// Minimum seconds between idle sweeps.
    pub cleanup_interval_secs: u64,
    /// Seconds a handle may sit unused before a sweep drops it.
    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 5,
            cleanup_interval_secs: 300,
            idle_timeout_secs: 1800,
        }
    }
}

/// Batch helper parameters (`[batch]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: usize,
    /// Pause between chunks, in milliseconds.
    pub delay_between_batches_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            delay_between_batches_ms: 200,
        }
    }
}

/// Global configuration loaded from `~/.config/calguard/config.toml`.
///
/// Every section is optional; missing sections and keys fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalguardConfig {
    /// Language for user-facing failure messages.
    pub locale: Locale,
    pub retry: RetryConfig,
    pub perf: PerfConfig,
    pub pool: PoolConfig,
    pub batch: BatchConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("calguard")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CalguardConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CalguardConfig::default();
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

/// Load configuration from an explicit path.
pub fn load_from_path(path: &Path) -> Result<CalguardConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: CalguardConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = CalguardConfig::default();
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(
            cfg.retry.retryable,
            vec![FailureKind::TransientNetwork, FailureKind::QuotaExceeded]
        );
        assert_eq!(cfg.perf.window_capacity, 100);
        assert!((cfg.perf.report_threshold_secs - 3.0).abs() < 1e-9);
        assert_eq!(cfg.pool.max_size, 5);
        assert_eq!(cfg.pool.cleanup_interval_secs, 300);
        assert_eq!(cfg.pool.idle_timeout_secs, 1800);
        assert_eq!(cfg.batch.batch_size, 10);
        assert_eq!(cfg.locale, Locale::En);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = CalguardConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CalguardConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: CalguardConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, CalguardConfig::default());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            locale = "ko"

            [retry]
            max_attempts = 5
            initial_delay_secs = 0.25
            retryable = ["transient-network", "server-error"]

            [pool]
            max_size = 2

            [batch]
            delay_between_batches_ms = 50
        "#;
        let cfg: CalguardConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.locale, Locale::Ko);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert!((cfg.retry.initial_delay_secs - 0.25).abs() < 1e-9);
        assert!((cfg.retry.backoff_factor - 2.0).abs() < 1e-9);
        assert_eq!(
            cfg.retry.retryable,
            vec![FailureKind::TransientNetwork, FailureKind::ServerError]
        );
        assert_eq!(cfg.pool.max_size, 2);
        assert_eq!(cfg.pool.idle_timeout_secs, 1800);
        assert_eq!(cfg.batch.batch_size, 10);
        assert_eq!(cfg.batch.delay_between_batches_ms, 50);
    }

    #[test]
    fn unknown_failure_kind_is_rejected() {
        let toml = r#"
            [retry]
            retryable = ["cosmic-rays"]
        "#;
        assert!(toml::from_str::<CalguardConfig>(toml).is_err());
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[perf]\nwindow_capacity = 20\n").unwrap();
        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.perf.window_capacity, 20);
        assert!(load_from_path(&dir.path().join("missing.toml")).is_err());
    }
}
