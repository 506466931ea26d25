//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the monitor runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the Sunkalp workspace: configuration loading,
//! logging bootstrap, timestamp helpers and version metadata.

pub mod config;
pub mod logging;
pub mod time;
pub mod version;

pub use config::{
    AlertConfig, AppConfig, LoadedAppConfig, LoggingConfig, NotificationConfig,
    NotificationPermission, StorageConfig, TelemetryConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use version::version_text;
