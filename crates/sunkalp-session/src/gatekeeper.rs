//! ---
//! ems_section: "06-security-access-control"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Session identity, persisted settings, and connection gating."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::claims::{decode_id_token, ClaimsError, IdentityClaims};
use crate::store::{KeyValueStore, StoreError, API_KEY_KEY, CHANNEL_ID_KEY, IDENTITY_KEY};

/// Coarse session state driving which view is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No identity; only sign-in is possible.
    SignedOut,
    /// Identity present, telemetry not connected.
    SignedIn,
    /// Identity present and telemetry polling authorised.
    Connected,
}

/// Telemetry channel credentials. Both parts are always non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    channel_id: String,
    api_key: String,
}

impl Credentials {
    /// Build credentials from user input; surrounding whitespace is dropped
    /// and `None` is returned when either part ends up empty.
    pub fn new(channel_id: &str, api_key: &str) -> Option<Self> {
        let channel_id = channel_id.trim();
        let api_key = api_key.trim();
        if channel_id.is_empty() || api_key.is_empty() {
            return None;
        }
        Some(Self {
            channel_id: channel_id.to_owned(),
            api_key: api_key.to_owned(),
        })
    }

    /// Channel identifier.
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Read API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        let visible = chars.len().saturating_sub(4);
        chars
            .iter()
            .enumerate()
            .map(|(idx, c)| if idx < visible { '•' } else { *c })
            .collect()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("channel_id", &self.channel_id)
            .field("api_key", &self.masked_api_key())
            .finish()
    }
}

/// In-memory session mirrored to the key-value store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Signed-in user's claims.
    pub identity: Option<IdentityClaims>,
    /// Last submitted (or restored) credentials.
    pub credentials: Option<Credentials>,
    /// Whether telemetry polling is authorised.
    pub connected: bool,
}

/// Errors surfaced by gatekeeper transitions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The identity token could not be decoded.
    #[error("identity token rejected: {0}")]
    InvalidToken(#[from] ClaimsError),
    /// Channel id or API key was empty.
    #[error("channel id and api key are both required")]
    MissingCredentials,
    /// A transition requiring an identity was attempted while signed out.
    #[error("not signed in")]
    NotSignedIn,
    /// Persisting the session failed.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),
}

/// Owns the [`Session`] and enforces the sign-in/connect state machine.
///
/// Storage failures never block a transition: they are logged and the
/// in-memory session stays authoritative until the next successful write.
#[derive(Debug)]
pub struct SessionGatekeeper<S> {
    session: Session,
    store: S,
}

impl<S: KeyValueStore> SessionGatekeeper<S> {
    /// Rebuild the session from persisted entries.
    ///
    /// A readable identity starts the session signed in; persisted
    /// credentials are loaded for convenience but never auto-connect.
    pub fn restore(store: S) -> Self {
        let identity = store.get(IDENTITY_KEY).and_then(|raw| {
            match serde_json::from_str::<IdentityClaims>(&raw) {
                Ok(claims) => Some(claims),
                Err(err) => {
                    warn!(error = %err, "discarding unreadable persisted identity");
                    None
                }
            }
        });
        if let Some(claims) = &identity {
            if claims.is_expired(Utc::now()) {
                warn!(subject = %claims.sub, "restored identity token has expired");
            }
        }
        let credentials = match (store.get(CHANNEL_ID_KEY), store.get(API_KEY_KEY)) {
            (Some(channel_id), Some(api_key)) => Credentials::new(&channel_id, &api_key),
            _ => None,
        };
        let session = Session {
            identity,
            credentials,
            connected: false,
        };
        let gatekeeper = Self { session, store };
        debug!(state = ?gatekeeper.state(), "session restored");
        gatekeeper
    }

    /// Current state derived from the session contents.
    pub fn state(&self) -> SessionState {
        match (&self.session.identity, self.session.connected) {
            (None, _) => SessionState::SignedOut,
            (Some(_), false) => SessionState::SignedIn,
            (Some(_), true) => SessionState::Connected,
        }
    }

    /// Read-only view of the session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Signed-in user's claims.
    pub fn identity(&self) -> Option<&IdentityClaims> {
        self.session.identity.as_ref()
    }

    /// Remembered credentials, whether or not currently connected.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.session.credentials.as_ref()
    }

    /// Whether telemetry polling is authorised.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Borrow the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Accept an identity token from the provider callback.
    ///
    /// On failure the session is left untouched.
    pub fn complete_sign_in(&mut self, raw_token: &str) -> Result<&IdentityClaims, SessionError> {
        let claims = match decode_id_token(raw_token) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(error = %err, "sign-in failed");
                return Err(err.into());
            }
        };
        match serde_json::to_string(&claims) {
            Ok(serialized) => self.persist(IDENTITY_KEY, &serialized),
            Err(err) => warn!(error = %err, "unable to serialize identity for persistence"),
        }
        info!(subject = %claims.sub, name = %claims.display_name(), "signed in");
        Ok(self.session.identity.insert(claims))
    }

    /// Drop identity, credentials and connection, and clear every persisted key.
    pub fn sign_out(&mut self) {
        let was = self.state();
        self.session = Session::default();
        for key in [IDENTITY_KEY, CHANNEL_ID_KEY, API_KEY_KEY] {
            if let Err(err) = self.store.remove(key) {
                warn!(key, error = %err, "failed to clear persisted session key");
            }
        }
        info!(previous = ?was, "signed out");
    }

    /// Validate and persist credentials, then authorise polling.
    pub fn submit_connection(
        &mut self,
        channel_id: &str,
        api_key: &str,
    ) -> Result<&Credentials, SessionError> {
        if self.session.identity.is_none() {
            return Err(SessionError::NotSignedIn);
        }
        let credentials =
            Credentials::new(channel_id, api_key).ok_or(SessionError::MissingCredentials)?;
        self.persist(CHANNEL_ID_KEY, credentials.channel_id());
        self.persist(API_KEY_KEY, credentials.api_key());
        self.session.connected = true;
        info!(channel_id = %credentials.channel_id(), "telemetry connection authorised");
        Ok(self.session.credentials.insert(credentials))
    }

    /// Revoke polling authorisation while keeping the credentials.
    ///
    /// Returns whether the session was connected.
    pub fn disconnect(&mut self) -> bool {
        let was_connected = std::mem::replace(&mut self.session.connected, false);
        if was_connected {
            info!("telemetry connection closed");
        }
        was_connected
    }

    fn persist(&mut self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            warn!(key, error = %err, "failed to persist session key");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::tests::encode_token;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn token() -> String {
        encode_token(&json!({"sub": "u-1", "name": "Test User"}))
    }

    #[test]
    fn credentials_require_both_parts() {
        assert!(Credentials::new("", "key").is_none());
        assert!(Credentials::new("123", "").is_none());
        assert!(Credentials::new("  ", "key").is_none());
        let creds = Credentials::new(" 123 ", "ABCDEF").unwrap();
        assert_eq!(creds.channel_id(), "123");
        assert_eq!(creds.masked_api_key(), "••CDEF");
        assert!(!format!("{creds:?}").contains("ABCDEF"));
    }

    #[test]
    fn full_transition_cycle() {
        let mut gate = SessionGatekeeper::restore(MemoryStore::new());
        assert_eq!(gate.state(), SessionState::SignedOut);

        gate.complete_sign_in(&token()).unwrap();
        assert_eq!(gate.state(), SessionState::SignedIn);

        gate.submit_connection("123", "KEY").unwrap();
        assert_eq!(gate.state(), SessionState::Connected);

        assert!(gate.disconnect());
        assert_eq!(gate.state(), SessionState::SignedIn);
        assert_eq!(gate.credentials().unwrap().channel_id(), "123");
        assert!(!gate.disconnect());

        gate.sign_out();
        assert_eq!(gate.state(), SessionState::SignedOut);
        assert!(gate.credentials().is_none());
        assert!(gate.store().is_empty());
    }

    #[test]
    fn empty_fields_never_connect() {
        let mut gate = SessionGatekeeper::restore(MemoryStore::new());
        gate.complete_sign_in(&token()).unwrap();
        for (channel, key) in [("", "KEY"), ("123", ""), ("", ""), (" ", "\t")] {
            let err = gate.submit_connection(channel, key).unwrap_err();
            assert!(matches!(err, SessionError::MissingCredentials));
            assert_eq!(gate.state(), SessionState::SignedIn);
        }
        assert!(gate.store().get(CHANNEL_ID_KEY).is_none());
    }

    #[test]
    fn connect_requires_identity() {
        let mut gate = SessionGatekeeper::restore(MemoryStore::new());
        let err = gate.submit_connection("123", "KEY").unwrap_err();
        assert!(matches!(err, SessionError::NotSignedIn));
        assert_eq!(gate.state(), SessionState::SignedOut);
    }

    #[test]
    fn bad_token_leaves_session_untouched() {
        let mut gate = SessionGatekeeper::restore(MemoryStore::new());
        assert!(gate.complete_sign_in("garbage").is_err());
        assert_eq!(gate.state(), SessionState::SignedOut);
        assert!(gate.store().get(IDENTITY_KEY).is_none());
    }

    #[test]
    fn restore_never_auto_connects() {
        let mut store = MemoryStore::new();
        store
            .set(IDENTITY_KEY, r#"{"sub":"u-1","name":"Test User"}"#)
            .unwrap();
        store.set(CHANNEL_ID_KEY, "123456").unwrap();
        store.set(API_KEY_KEY, "ABCDEF123456").unwrap();
        let gate = SessionGatekeeper::restore(store);
        assert_eq!(gate.state(), SessionState::SignedIn);
        assert_eq!(gate.identity().unwrap().display_name(), "Test User");
        assert_eq!(gate.credentials().unwrap().api_key(), "ABCDEF123456");
    }

    #[test]
    fn restore_ignores_partial_credentials() {
        let mut store = MemoryStore::new();
        store.set(IDENTITY_KEY, r#"{"sub":"u-1"}"#).unwrap();
        store.set(CHANNEL_ID_KEY, "123456").unwrap();
        let gate = SessionGatekeeper::restore(store);
        assert!(gate.credentials().is_none());
    }

    #[test]
    fn unreadable_identity_starts_signed_out() {
        let mut store = MemoryStore::new();
        store.set(IDENTITY_KEY, "not json").unwrap();
        let gate = SessionGatekeeper::restore(store);
        assert_eq!(gate.state(), SessionState::SignedOut);
    }
}
