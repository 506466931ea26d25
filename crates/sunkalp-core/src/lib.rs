//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Monitor runtime crate entry point."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Application state and runtime for the Sunkalp monitor.
//!
//! [`Dashboard`] owns the session and the displayed telemetry,
//! [`PollScheduler`] drives fetches on a fixed interval, and [`Monitor`]
//! connects the two through a report channel.

pub mod dashboard;
pub mod monitor;
pub mod poller;

pub use dashboard::{Dashboard, PollOutcome, PollReport, TelemetryState};
pub use monitor::Monitor;
pub use poller::{PollHandle, PollScheduler};
