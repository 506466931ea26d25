//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Configuration model and loader for the monitor runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_endpoint() -> Url {
    Url::parse("https://api.thingspeak.com").expect("valid default telemetry endpoint")
}

fn default_results() -> usize {
    15
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_overheat_celsius() -> f64 {
    50.0
}

fn default_low_battery_percent() -> f64 {
    20.0
}

fn default_storage_directory() -> PathBuf {
    PathBuf::from(".sunkalp")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_log_stdout() -> bool {
    true
}

/// Primary configuration object for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
///
/// `source` is `None` when no candidate existed and defaults were used.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "SUNKALP_CONFIG";

    /// Load configuration from disk, respecting the `SUNKALP_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `SUNKALP_CONFIG` path must exist; the candidate list is
    /// probed in order and the built-in defaults apply when none is present.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.telemetry.validate()?;
        self.alerts.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Remote feed settings.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: Url,
    /// Number of most recent samples requested per poll.
    #[serde(default = "default_results")]
    pub results: usize,
    #[serde(default = "default_poll_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub poll_interval: Duration,
    /// Optional per-request timeout; the HTTP client default applies when unset.
    #[serde(default)]
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    pub request_timeout: Option<Duration>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            results: default_results(),
            poll_interval: default_poll_interval(),
            request_timeout: None,
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.endpoint.scheme(), "http" | "https") {
            return Err(anyhow!(
                "telemetry endpoint {} must use http or https",
                self.endpoint
            ));
        }
        if self.results == 0 {
            return Err(anyhow!("telemetry results must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(anyhow!("telemetry poll_interval must be non-zero"));
        }
        if matches!(self.request_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(anyhow!("telemetry request_timeout must be non-zero when set"));
        }
        Ok(())
    }
}

/// Threshold rules applied to the newest reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Temperatures strictly above this raise an overheat alert.
    #[serde(default = "default_overheat_celsius")]
    pub overheat_celsius: f64,
    /// Charge levels strictly between zero and this raise a low-battery alert.
    #[serde(default = "default_low_battery_percent")]
    pub low_battery_percent: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            overheat_celsius: default_overheat_celsius(),
            low_battery_percent: default_low_battery_percent(),
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.overheat_celsius.is_finite() {
            return Err(anyhow!("alerts.overheat_celsius must be a finite number"));
        }
        if !self.low_battery_percent.is_finite()
            || self.low_battery_percent <= 0.0
            || self.low_battery_percent > 100.0
        {
            return Err(anyhow!(
                "alerts.low_battery_percent must be within (0, 100], got {}",
                self.low_battery_percent
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted session file.
    #[serde(default = "default_storage_directory")]
    pub directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_storage_directory(),
        }
    }
}

/// Whether the local environment allows system notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    Granted,
    Denied,
    #[default]
    Default,
}

impl NotificationPermission {
    pub fn is_granted(&self) -> bool {
        matches!(self, NotificationPermission::Granted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationConfig {
    #[serde(default)]
    pub permission: NotificationPermission,
    /// External program plus leading arguments; title and body are appended.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Mirror log output to stdout in addition to the rolling file.
    #[serde(default = "default_log_stdout")]
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            stdout: default_log_stdout(),
        }
    }
}
