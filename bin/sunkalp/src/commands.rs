//! ---
//! ems_section: "12-gui-setup-wizard"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "One-shot CLI commands for session management and polling."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::io::{self, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use sunkalp_common::config::AppConfig;
use sunkalp_common::time::format_sync_time;
use sunkalp_core::{Monitor, PollOutcome, TelemetryState};
use sunkalp_session::{FileStore, SessionState};
use tokio::signal;
use tracing::{info, warn};

pub fn login(mut monitor: Monitor<FileStore>, token: &str) -> Result<()> {
    let token = if token == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read identity token from stdin")?;
        buffer
    } else {
        token.to_owned()
    };
    let claims = monitor
        .complete_sign_in(token.trim())
        .context("sign-in failed")?;
    println!("Signed in as {}", claims.display_name());
    Ok(())
}

pub fn logout(mut monitor: Monitor<FileStore>) {
    monitor.sign_out();
    println!("Signed out; persisted session cleared");
}

pub async fn connect(mut monitor: Monitor<FileStore>, channel: &str, api_key: &str) -> Result<()> {
    monitor
        .connect(channel, api_key)
        .context("unable to connect")?;
    let outcome = monitor.next_report().await;
    match outcome {
        Some(PollOutcome::Applied { samples, alerts }) => {
            println!("Connected to channel {channel}: {samples} samples, {alerts} alerts");
        }
        _ => {
            warn!(?outcome, "first poll did not succeed");
            println!("Credentials saved for channel {channel}, but the first poll failed");
        }
    }
    monitor.shutdown().await;
    Ok(())
}

pub fn status(monitor: &Monitor<FileStore>, config: &AppConfig, config_source: Option<&Path>) {
    let dashboard = monitor.dashboard();
    let state = match dashboard.state() {
        SessionState::SignedOut => "signed out",
        SessionState::SignedIn => "signed in",
        SessionState::Connected => "connected",
    };
    println!("Session:       {state}");
    if let Some(identity) = dashboard.identity() {
        println!("User:          {}", identity.display_name());
        if let Some(email) = &identity.email {
            println!("Email:         {email}");
        }
        if let Some(expires) = identity.expires_at() {
            println!("Token expires: {expires}");
        }
    }
    match dashboard.credentials() {
        Some(credentials) => {
            println!("Channel:       {}", credentials.channel_id());
            println!("API key:       {}", credentials.masked_api_key());
        }
        None => println!("Channel:       (not configured)"),
    }
    println!(
        "Session file:  {}",
        dashboard.gatekeeper().store().path().display()
    );
    println!(
        "Config:        {}",
        config_source
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "(built-in defaults)".to_owned())
    );
    println!("Endpoint:      {}", config.telemetry.endpoint);
    println!(
        "Poll interval: {}s",
        config.telemetry.poll_interval.as_secs_f64()
    );
}

pub async fn poll(
    mut monitor: Monitor<FileStore>,
    overrides: Option<(String, String)>,
) -> Result<()> {
    let started = match &overrides {
        Some((channel, api_key)) => monitor.connect(channel, api_key),
        None => monitor.resume(),
    };
    started.context("unable to poll; sign in and connect first")?;

    let outcome = monitor.next_report().await;
    let failed = !matches!(outcome, Some(PollOutcome::Applied { .. }));
    print_telemetry(monitor.dashboard().telemetry());
    monitor.shutdown().await;
    if failed {
        bail!("telemetry poll failed");
    }
    Ok(())
}

pub async fn watch(mut monitor: Monitor<FileStore>) -> Result<()> {
    monitor
        .resume()
        .context("unable to start watching; sign in and connect first")?;
    info!(
        interval_secs = monitor.scheduler().interval().as_secs_f64(),
        "watching telemetry; press ctrl-c to stop"
    );
    loop {
        tokio::select! {
            interrupted = signal::ctrl_c() => {
                interrupted.context("failed to listen for ctrl-c")?;
                info!("ctrl-c received; stopping");
                break;
            }
            outcome = monitor.next_report() => {
                match outcome {
                    Some(PollOutcome::Applied { .. }) => print_summary(monitor.dashboard().telemetry()),
                    Some(PollOutcome::Failed | PollOutcome::Stale) => {}
                    None => break,
                }
            }
        }
    }
    monitor.shutdown().await;
    Ok(())
}

fn print_summary(telemetry: &TelemetryState) {
    let synced = telemetry
        .last_update
        .as_ref()
        .map(format_sync_time)
        .unwrap_or_else(|| "--:--:--".to_owned());
    match telemetry.window.latest() {
        Some(latest) => println!(
            "[{synced}] {:.1} V  {:.1} A  {:.0} %  {:.0} W  {:.1} °C",
            latest.voltage,
            latest.current,
            latest.state_of_charge,
            latest.load_power,
            latest.temperature
        ),
        None => println!("[{synced}] no samples"),
    }
    for alert in &telemetry.alerts {
        println!("  ! {alert}");
    }
}

fn print_telemetry(telemetry: &TelemetryState) {
    if telemetry.window.is_empty() {
        println!("No samples available");
    } else {
        println!(
            "{:<6} {:>10} {:>10} {:>8} {:>10} {:>9}",
            "TIME", "VOLTAGE V", "CURRENT A", "SOC %", "LOAD W", "TEMP °C"
        );
        for reading in telemetry.window.readings() {
            println!(
                "{:<6} {:>10.2} {:>10.2} {:>8.1} {:>10.1} {:>9.1}",
                reading.time,
                reading.voltage,
                reading.current,
                reading.state_of_charge,
                reading.load_power,
                reading.temperature
            );
        }
    }
    if telemetry.alerts.is_empty() {
        println!("Alerts: none");
    } else {
        println!("Alerts:");
        for alert in &telemetry.alerts {
            println!("  {alert}");
        }
    }
}
