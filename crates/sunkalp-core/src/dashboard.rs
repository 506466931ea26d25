//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Application state owner: session, telemetry window, and alerts."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sunkalp_session::{
    Credentials, IdentityClaims, KeyValueStore, SessionError, SessionGatekeeper, SessionState,
};
use sunkalp_telemetry::{
    dispatch, evaluate, Alert, AlertThresholds, Notifier, Reading, ReadingWindow,
    TelemetryError,
};
use tracing::{debug, info, warn};

/// Result of one fetch, tagged with the connection generation that issued it.
#[derive(Debug)]
pub struct PollReport {
    pub generation: u64,
    pub result: Result<Vec<Reading>, TelemetryError>,
    pub completed_at: DateTime<Utc>,
}

/// What [`Dashboard::apply_poll`] did with a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Window replaced; `alerts` is the size of the new alert set.
    Applied { samples: usize, alerts: usize },
    /// The fetch failed; the previous window and alerts were kept.
    Failed,
    /// The report belonged to an earlier connection and was dropped.
    Stale,
}

/// Telemetry shown while connected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryState {
    pub window: ReadingWindow,
    pub alerts: Vec<Alert>,
    /// Completion time of the last successful poll.
    pub last_update: Option<DateTime<Utc>>,
}

impl TelemetryState {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Single owner of all mutable application state.
///
/// Every transition that ends a connection epoch bumps `generation`, so
/// reports still in flight from the previous epoch are recognised as stale.
pub struct Dashboard<S> {
    gatekeeper: SessionGatekeeper<S>,
    telemetry: TelemetryState,
    thresholds: AlertThresholds,
    capacity: usize,
    notifier: Arc<dyn Notifier>,
    generation: u64,
}

impl<S: KeyValueStore> Dashboard<S> {
    pub fn new(
        gatekeeper: SessionGatekeeper<S>,
        thresholds: AlertThresholds,
        capacity: usize,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gatekeeper,
            telemetry: TelemetryState::default(),
            thresholds,
            capacity: capacity.max(1),
            notifier,
            generation: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.gatekeeper.state()
    }

    pub fn gatekeeper(&self) -> &SessionGatekeeper<S> {
        &self.gatekeeper
    }

    pub fn identity(&self) -> Option<&IdentityClaims> {
        self.gatekeeper.identity()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.gatekeeper.credentials()
    }

    pub fn telemetry(&self) -> &TelemetryState {
        &self.telemetry
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Current connection generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn complete_sign_in(&mut self, raw_token: &str) -> Result<&IdentityClaims, SessionError> {
        self.gatekeeper.complete_sign_in(raw_token)
    }

    /// Sign out and forget every piece of telemetry.
    pub fn sign_out(&mut self) {
        self.gatekeeper.sign_out();
        self.telemetry.clear();
        self.bump_generation();
    }

    /// Accept connection credentials and open a new polling epoch.
    ///
    /// On error nothing changes, including the generation.
    pub fn submit_connection(
        &mut self,
        channel_id: &str,
        api_key: &str,
    ) -> Result<Credentials, SessionError> {
        let credentials = self
            .gatekeeper
            .submit_connection(channel_id, api_key)?
            .clone();
        self.telemetry.clear();
        self.bump_generation();
        Ok(credentials)
    }

    /// Stop accepting poll results and clear the window and alerts.
    pub fn disconnect(&mut self) -> bool {
        let was_connected = self.gatekeeper.disconnect();
        self.telemetry.clear();
        self.bump_generation();
        was_connected
    }

    /// Fold a poll report into the displayed state.
    pub fn apply_poll(&mut self, report: PollReport) -> PollOutcome {
        if report.generation != self.generation || !self.gatekeeper.is_connected() {
            debug!(
                report_generation = report.generation,
                current_generation = self.generation,
                connected = self.gatekeeper.is_connected(),
                "discarding stale poll report"
            );
            return PollOutcome::Stale;
        }
        let readings = match report.result {
            Ok(readings) => readings,
            Err(err) => {
                warn!(error = %err, "telemetry poll failed; keeping previous window");
                return PollOutcome::Failed;
            }
        };

        self.telemetry.window = ReadingWindow::from_readings(readings, self.capacity);
        self.telemetry.last_update = Some(report.completed_at);
        let samples = self.telemetry.window.len();

        // No newest reading means nothing to evaluate; the alert set stays.
        if let Some(latest) = self.telemetry.window.latest() {
            self.telemetry.alerts = evaluate(latest, &self.thresholds);
            let delivered = dispatch(self.notifier.as_ref(), &self.telemetry.alerts);
            for alert in &self.telemetry.alerts {
                info!(kind = ?alert.kind, value = alert.value, "threshold alert raised");
            }
            debug!(samples, delivered, "telemetry window updated");
        } else {
            debug!("telemetry poll returned no samples");
        }

        PollOutcome::Applied {
            samples,
            alerts: self.telemetry.alerts.len(),
        }
    }

    fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}
