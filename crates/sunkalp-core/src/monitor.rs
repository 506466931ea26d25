//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Monitor runtime wiring the dashboard state to the poll loop."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sunkalp_common::config::AppConfig;
use sunkalp_session::{FileStore, IdentityClaims, KeyValueStore, SessionError, SessionGatekeeper};
use sunkalp_telemetry::{notifier_from_config, AlertThresholds, ThingSpeakClient};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dashboard::{Dashboard, PollOutcome, PollReport};
use crate::poller::{PollHandle, PollScheduler};

/// Top-level runtime: owns the [`Dashboard`] and the active poll loop.
///
/// Poll reports arrive over a channel and are applied on the caller's task,
/// so the dashboard is never shared.
pub struct Monitor<S> {
    dashboard: Dashboard<S>,
    scheduler: PollScheduler,
    poll: Option<PollHandle>,
    reports_tx: mpsc::UnboundedSender<PollReport>,
    reports_rx: mpsc::UnboundedReceiver<PollReport>,
}

impl Monitor<FileStore> {
    /// Build a monitor backed by the HTTP feed client and the session file.
    ///
    /// `state_dir` overrides `storage.directory`.
    pub fn from_config(config: &AppConfig, state_dir: Option<&Path>) -> Result<Self> {
        let directory = state_dir.unwrap_or(config.storage.directory.as_path());
        let store = FileStore::open(directory)
            .with_context(|| format!("unable to open session store in {}", directory.display()))?;
        let client = ThingSpeakClient::from_config(&config.telemetry)
            .context("failed to build telemetry client")?;
        let dashboard = Dashboard::new(
            SessionGatekeeper::restore(store),
            AlertThresholds::from(&config.alerts),
            config.telemetry.results,
            Arc::from(notifier_from_config(&config.notifications)),
        );
        let scheduler = PollScheduler::new(Arc::new(client), config.telemetry.poll_interval);
        Ok(Self::new(dashboard, scheduler))
    }
}

impl<S: KeyValueStore> Monitor<S> {
    pub fn new(dashboard: Dashboard<S>, scheduler: PollScheduler) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            dashboard,
            scheduler,
            poll: None,
            reports_tx,
            reports_rx,
        }
    }

    pub fn dashboard(&self) -> &Dashboard<S> {
        &self.dashboard
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// Whether a poll loop is currently running.
    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    pub fn complete_sign_in(&mut self, raw_token: &str) -> Result<&IdentityClaims, SessionError> {
        self.dashboard.complete_sign_in(raw_token)
    }

    /// Authorise the connection and start polling under a new generation.
    pub fn connect(&mut self, channel_id: &str, api_key: &str) -> Result<(), SessionError> {
        let credentials = self.dashboard.submit_connection(channel_id, api_key)?;
        self.stop_polling();
        let handle = self.scheduler.start(
            self.dashboard.generation(),
            credentials,
            self.reports_tx.clone(),
        );
        self.poll = Some(handle);
        Ok(())
    }

    /// Reconnect with the stored credentials, if any.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        let credentials = self
            .dashboard
            .credentials()
            .cloned()
            .ok_or(SessionError::MissingCredentials)?;
        self.connect(credentials.channel_id(), credentials.api_key())
    }

    pub fn disconnect(&mut self) -> bool {
        self.stop_polling();
        self.dashboard.disconnect()
    }

    pub fn sign_out(&mut self) {
        self.stop_polling();
        self.dashboard.sign_out();
    }

    /// Wait for the next report and apply it.
    ///
    /// Pending forever while nothing is polling; callers select against
    /// their own shutdown signal.
    pub async fn next_report(&mut self) -> Option<PollOutcome> {
        let report = self.reports_rx.recv().await?;
        Some(self.dashboard.apply_poll(report))
    }

    /// Apply every report already queued, without waiting.
    pub fn drain_reports(&mut self) -> Vec<PollOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(report) = self.reports_rx.try_recv() {
            outcomes.push(self.dashboard.apply_poll(report));
        }
        outcomes
    }

    /// Stop polling and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.poll.take() {
            handle.join().await;
        }
        info!("monitor stopped");
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.poll.take() {
            debug!(generation = handle.generation(), "stopping telemetry polling");
            handle.stop();
        }
    }
}
