//! ---
//! ems_section: "06-security-access-control"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Session identity, persisted settings, and connection gating."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Decoded claims of an identity token.
///
/// Only the fields the dashboard displays are named; everything else the
/// provider sends is retained in `extra` so the persisted copy round-trips.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IdentityClaims {
    /// Subject identifier assigned by the identity provider.
    #[serde(default)]
    pub sub: String,
    /// Full display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Expiry as seconds since the unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issue time as seconds since the unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Remaining provider-specific claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdentityClaims {
    /// Name to greet the user with: name, then email, then subject.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.email.as_deref().filter(|email| !email.is_empty()))
            .unwrap_or(&self.sub)
    }

    /// Expiry instant, when the token declared one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// Whether the declared expiry lies at or before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expiry| expiry <= now)
    }
}

/// Errors raised while decoding an identity token.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The token has no payload segment.
    #[error("identity token has no payload segment")]
    MissingPayload,
    /// The payload segment is not valid base64url.
    #[error("identity token payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    /// The payload is not a JSON claims object.
    #[error("identity token payload is not a claims object: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Decode the payload segment of a JWT-shaped identity token.
///
/// The signature segment is ignored. Both the url-safe and the standard
/// base64 alphabets are accepted, with or without padding.
pub fn decode_id_token(token: &str) -> Result<IdentityClaims, ClaimsError> {
    let payload = token
        .trim()
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or(ClaimsError::MissingPayload)?;
    let normalized: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD.decode(normalized.as_bytes())?;
    let claims = serde_json::from_slice::<IdentityClaims>(&bytes)?;
    Ok(claims)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn encode_token(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn decodes_provider_claims() {
        let token = encode_token(&json!({
            "sub": "1098",
            "name": "Asha Rao",
            "email": "asha@example.com",
            "picture": "https://example.com/a.png",
            "exp": 1_700_000_000,
            "iat": 1_699_996_400,
            "email_verified": true,
        }));
        let claims = decode_id_token(&token).unwrap();
        assert_eq!(claims.sub, "1098");
        assert_eq!(claims.display_name(), "Asha Rao");
        assert_eq!(claims.picture.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(claims.extra.get("email_verified"), Some(&json!(true)));
        assert_eq!(
            claims.expires_at().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }

    #[test]
    fn accepts_padded_standard_alphabet() {
        let body = base64::engine::general_purpose::STANDARD
            .encode(serde_json::to_vec(&json!({"sub": "x?>", "name": "~~~"})).unwrap());
        let claims = decode_id_token(&format!("h.{body}.s")).unwrap();
        assert_eq!(claims.sub, "x?>");
    }

    #[test]
    fn rejects_token_without_payload() {
        assert!(matches!(
            decode_id_token("just-a-header"),
            Err(ClaimsError::MissingPayload)
        ));
        assert!(matches!(
            decode_id_token("header..sig"),
            Err(ClaimsError::MissingPayload)
        ));
    }

    #[test]
    fn rejects_non_object_payload() {
        let body = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        assert!(matches!(
            decode_id_token(&format!("h.{body}.s")),
            Err(ClaimsError::InvalidJson(_))
        ));
        assert!(matches!(
            decode_id_token("h.@@@.s"),
            Err(ClaimsError::InvalidBase64(_))
        ));
    }

    #[test]
    fn display_name_falls_back() {
        let claims = IdentityClaims {
            sub: "42".into(),
            email: Some("ops@example.com".into()),
            ..IdentityClaims::default()
        };
        assert_eq!(claims.display_name(), "ops@example.com");
        let bare = IdentityClaims {
            sub: "42".into(),
            ..IdentityClaims::default()
        };
        assert_eq!(bare.display_name(), "42");
    }

    #[test]
    fn expiry_check() {
        let claims = IdentityClaims {
            exp: Some(100),
            ..IdentityClaims::default()
        };
        assert!(claims.is_expired(Utc.timestamp_opt(100, 0).unwrap()));
        assert!(!claims.is_expired(Utc.timestamp_opt(99, 0).unwrap()));
        assert!(!IdentityClaims::default().is_expired(Utc::now()));
    }
}
