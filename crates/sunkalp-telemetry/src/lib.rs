//! ---
//! ems_section: "02-telemetry-processing"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry feed ingestion, normalization, and alerting."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Telemetry ingestion for the microgrid monitor: the remote feed client,
//! reading normalization, threshold alerts and notification delivery.

pub mod alerts;
pub mod feed;
pub mod notify;
pub mod reading;

/// Result alias used throughout the telemetry crate.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Failures of a single poll. None of them are fatal to the monitor.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Transport failure or non-success HTTP status.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The body was not the expected JSON document.
    #[error("malformed feed response: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The body parsed but carried no `feeds` list.
    #[error("feed response has no feeds list")]
    MissingFeeds,
    /// The configured endpoint cannot carry a path.
    #[error("invalid telemetry endpoint: {0}")]
    InvalidEndpoint(String),
}

pub use alerts::{evaluate, Alert, AlertKind, AlertThresholds};
pub use feed::{FeedRecord, FeedResponse, FeedSource, ThingSpeakClient};
pub use notify::{dispatch, notifier_from_config, CommandNotifier, Notifier, TracingNotifier};
pub use reading::{normalize_field, Metric, Reading, ReadingWindow};
