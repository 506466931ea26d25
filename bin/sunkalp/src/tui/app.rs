//! ---
//! ems_section: "12-gui-setup-wizard"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Terminal dashboard state and key handling."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use sunkalp_core::{Monitor, PollOutcome};
use sunkalp_session::{KeyValueStore, SessionError, SessionState};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Channel,
    ApiKey,
}

/// Connect form contents.
#[derive(Debug, Clone)]
pub struct ConnectForm {
    pub channel: String,
    pub api_key: String,
    pub focus: Field,
}

impl ConnectForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Channel => &mut self.channel,
            Field::ApiKey => &mut self.api_key,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Field::Channel => Field::ApiKey,
            Field::ApiKey => Field::Channel,
        };
    }
}

/// Severity of the one-line status shown under each view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Error,
}

pub struct App<S> {
    pub monitor: Monitor<S>,
    pub token_input: String,
    pub form: ConnectForm,
    pub status: Option<(Tone, String)>,
    quit: bool,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(monitor: Monitor<S>) -> Self {
        let form = prefilled_form(&monitor);
        Self {
            monitor,
            token_input: String::new(),
            form,
            status: None,
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn state(&self) -> SessionState {
        self.monitor.dashboard().state()
    }

    /// Apply queued poll reports.
    ///
    /// Failed polls leave the view untouched; the monitor logs them and the
    /// previous readings stay on screen.
    pub fn tick(&mut self) -> Vec<PollOutcome> {
        self.monitor.drain_reports()
    }

    /// Append pasted text to whichever input is active.
    pub fn paste(&mut self, text: &str) {
        let text = text.trim();
        match self.state() {
            SessionState::SignedOut => self.token_input.push_str(text),
            SessionState::SignedIn => self.form.focused_mut().push_str(text),
            SessionState::Connected => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }
        match self.state() {
            SessionState::SignedOut => self.sign_in_key(key, ctrl),
            SessionState::SignedIn => self.connect_key(key, ctrl),
            SessionState::Connected => self.dashboard_key(key),
        }
    }

    fn sign_in_key(&mut self, key: KeyEvent, ctrl: bool) {
        match key.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Enter => self.submit_sign_in(),
            KeyCode::Backspace => {
                self.token_input.pop();
            }
            KeyCode::Char('u') if ctrl => self.token_input.clear(),
            KeyCode::Char(c) if !ctrl => self.token_input.push(c),
            _ => {}
        }
    }

    fn connect_key(&mut self, key: KeyEvent, ctrl: bool) {
        match key.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Char('o') if ctrl => self.sign_out(),
            KeyCode::Char('u') if ctrl => self.form.focused_mut().clear(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.form.toggle_focus()
            }
            KeyCode::Enter => self.submit_connection(),
            KeyCode::Backspace => {
                self.form.focused_mut().pop();
            }
            KeyCode::Char(c) if !ctrl => self.form.focused_mut().push(c),
            _ => {}
        }
    }

    fn dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('d') => {
                self.monitor.disconnect();
                self.form = prefilled_form(&self.monitor);
                self.status = Some((Tone::Info, "Disconnected".to_owned()));
            }
            KeyCode::Char('o') => self.sign_out(),
            _ => {}
        }
    }

    fn submit_sign_in(&mut self) {
        let token = std::mem::take(&mut self.token_input);
        match self.monitor.complete_sign_in(token.trim()) {
            Ok(claims) => {
                let welcome = format!("Welcome, {}", claims.display_name());
                self.status = Some((Tone::Info, welcome));
                self.form = prefilled_form(&self.monitor);
            }
            Err(err) => {
                debug!(error = %err, "sign-in rejected in dashboard");
                self.status = Some((Tone::Error, format!("Sign-in failed: {err}")));
            }
        }
    }

    fn submit_connection(&mut self) {
        let channel = self.form.channel.clone();
        let api_key = self.form.api_key.clone();
        match self.monitor.connect(&channel, &api_key) {
            Ok(()) => self.status = None,
            Err(SessionError::MissingCredentials) => {
                self.status = Some((
                    Tone::Error,
                    "Channel ID and Read API Key are both required".to_owned(),
                ));
            }
            Err(err) => self.status = Some((Tone::Error, err.to_string())),
        }
    }

    fn sign_out(&mut self) {
        self.monitor.sign_out();
        self.token_input.clear();
        self.form = prefilled_form(&self.monitor);
        self.status = Some((Tone::Info, "Signed out".to_owned()));
    }
}

fn prefilled_form<S: KeyValueStore>(monitor: &Monitor<S>) -> ConnectForm {
    let (channel, api_key) = monitor
        .dashboard()
        .credentials()
        .map(|c| (c.channel_id().to_owned(), c.api_key().to_owned()))
        .unwrap_or_default();
    ConnectForm {
        channel,
        api_key,
        focus: Field::Channel,
    }
}
