//! ---
//! ems_section: "06-security-access-control"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Session identity, persisted settings, and connection gating."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Session gatekeeping for the monitor.
//!
//! Identity tokens are decoded locally without signature verification. The
//! identity provider's client performs verification before handing the token
//! over; nothing in this crate establishes authenticity.

pub mod claims;
pub mod gatekeeper;
pub mod store;

pub use claims::{decode_id_token, ClaimsError, IdentityClaims};
pub use gatekeeper::{Credentials, Session, SessionError, SessionGatekeeper, SessionState};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
