//! ---
//! ems_section: "02-telemetry-processing"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Permission-gated local notifications for raised alerts."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::process::Stdio;

use sunkalp_common::config::{NotificationConfig, NotificationPermission};
use tokio::process::Command;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::alerts::Alert;

/// Sink for best-effort local notifications.
pub trait Notifier: Send + Sync {
    /// Permission granted by the local environment.
    fn permission(&self) -> NotificationPermission;
    /// Deliver one notification. Must not block.
    fn notify(&self, title: &str, body: &str);
}

/// Emit one notification per alert when permission has been granted.
///
/// Returns how many notifications were handed to the notifier.
pub fn dispatch(notifier: &dyn Notifier, alerts: &[Alert]) -> usize {
    if !notifier.permission().is_granted() {
        if !alerts.is_empty() {
            debug!(alerts = alerts.len(), "notification permission not granted; suppressed");
        }
        return 0;
    }
    for alert in alerts {
        notifier.notify(alert.kind.notification_title(), &alert.notification_body());
    }
    alerts.len()
}

/// Notifier that records deliveries in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier {
    permission: NotificationPermission,
}

impl TracingNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self { permission }
    }
}

impl Notifier for TracingNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn notify(&self, title: &str, body: &str) {
        warn!(target: "sunkalp::notification", title, body, "alert notification");
    }
}

/// Notifier that runs an external program (e.g. `notify-send`) with the
/// title and body appended to its arguments.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    permission: NotificationPermission,
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    /// `None` when the command line is empty.
    pub fn new(permission: NotificationPermission, command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            permission,
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Notifier for CommandNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn notify(&self, title: &str, body: &str) {
        warn!(target: "sunkalp::notification", title, body, "alert notification");
        let Ok(runtime) = Handle::try_current() else {
            warn!(program = %self.program, "no async runtime; notification command skipped");
            return;
        };
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(title)
            .arg(body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                runtime.spawn(async move {
                    if let Err(err) = child.wait().await {
                        debug!(error = %err, "notification command wait failed");
                    }
                });
            }
            Err(err) => {
                warn!(program = %self.program, error = %err, "failed to launch notification command");
            }
        }
    }
}

/// Pick the notifier described by the configuration.
pub fn notifier_from_config(config: &NotificationConfig) -> Box<dyn Notifier> {
    match config
        .command
        .as_deref()
        .and_then(|command| CommandNotifier::new(config.permission, command))
    {
        Some(notifier) => Box::new(notifier),
        None => Box::new(TracingNotifier::new(config.permission)),
    }
}
