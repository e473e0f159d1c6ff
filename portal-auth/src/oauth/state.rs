//! Signed OAuth `state` values.
//!
//! The callback arrives as a browser redirect without the user's session header, so the
//! state blob is what tells us which tenant and user a linked account belongs to. It is
//! not confidential but must not be forgeable: the payload is HMAC-SHA256 signed and
//! carries its issue time so stale values are refused.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use log::*;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{config_error, oauth_error, ConfigErrorKind, Error, OAuthErrorKind};

type HmacSha256 = Hmac<Sha256>;

/// Keeps state MACs distinct from any other MAC computed with the same secret.
const MAC_CONTEXT: &[u8] = b"cp.oauth-state.v1:";

/// Identity recovered from a valid state value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub tenant_id: String,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatePayload {
    tenant_id: String,
    user_id: String,
    nonce: String,
    iat: i64,
}

/// Encodes and decodes tamper-evident OAuth state values.
#[derive(Clone)]
pub struct StateCodec {
    mac: HmacSha256,
    ttl: Duration,
}

impl StateCodec {
    /// Create a state codec with default TTL of 10 minutes.
    pub fn new(secret: &SecretString) -> Result<Self, Error> {
        Self::with_ttl(secret, Duration::minutes(10))
    }

    /// Create a state codec with custom TTL.
    pub fn with_ttl(secret: &SecretString, ttl: Duration) -> Result<Self, Error> {
        let mac = <HmacSha256 as Mac>::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|_| {
                config_error(
                    ConfigErrorKind::MissingSigningSecret,
                    "state signing key rejected",
                )
            })?;
        Ok(Self { mac, ttl })
    }

    /// Produce a state value binding the authorization request to a tenant user.
    pub fn encode(&self, tenant_id: &str, user_id: &str) -> String {
        let nonce: [u8; 16] = rand::thread_rng().gen();
        let payload = StatePayload {
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            nonce: hex::encode(nonce),
            iat: Utc::now().timestamp(),
        };

        // Serializing a struct of strings and an integer cannot fail
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        self.seal(&json)
    }

    /// Recover the identity from a state value.
    ///
    /// Fails closed: any encoding, signature, structure or age problem yields
    /// `InvalidState` and never a partially populated result.
    pub fn decode(&self, state: &str) -> Result<OAuthState, Error> {
        let invalid = |reason: &str| {
            debug!("Rejected OAuth state: {}", reason);
            oauth_error(OAuthErrorKind::InvalidState, "invalid OAuth state")
        };

        let (payload_b64, signature_b64) =
            state.split_once('.').ok_or_else(|| invalid("missing signature"))?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| invalid("payload is not base64"))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| invalid("signature is not base64"))?;

        let mut mac = self.mac.clone();
        mac.update(MAC_CONTEXT);
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| invalid("signature mismatch"))?;

        let payload: StatePayload =
            serde_json::from_slice(&payload).map_err(|_| invalid("malformed payload"))?;

        if payload.tenant_id.is_empty() || payload.user_id.is_empty() {
            return Err(invalid("empty identity"));
        }

        let age = Utc::now().timestamp() - payload.iat;
        if age < 0 || age > self.ttl.num_seconds() {
            return Err(invalid("expired"));
        }

        Ok(OAuthState {
            tenant_id: payload.tenant_id,
            user_id: payload.user_id,
        })
    }

    fn seal(&self, payload: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(MAC_CONTEXT);
        mac.update(payload);
        let signature = mac.finalize().into_bytes();

        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }
}

impl std::fmt::Debug for StateCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> StateCodec {
        StateCodec::new(&SecretString::new("state-test-secret".to_string())).unwrap()
    }

    fn is_invalid_state(result: Result<OAuthState, Error>) -> bool {
        result.err().and_then(|e| e.oauth_kind()) == Some(OAuthErrorKind::InvalidState)
    }

    #[test]
    fn test_decode_recovers_identity() {
        let state = codec().encode("t1", "u1");

        let decoded = codec().decode(&state).unwrap();

        assert_eq!(
            decoded,
            OAuthState {
                tenant_id: "t1".to_string(),
                user_id: "u1".to_string(),
            }
        );
    }

    #[test]
    fn test_identity_with_separator_characters_survives() {
        let state = codec().encode("clinic.north/1", "user=a&b");
        let decoded = codec().decode(&state).unwrap();
        assert_eq!(decoded.tenant_id, "clinic.north/1");
        assert_eq!(decoded.user_id, "user=a&b");
    }

    #[test]
    fn test_encoded_state_is_query_safe() {
        let state = codec().encode("t1", "u1");
        assert!(state
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    }

    #[test]
    fn test_states_are_unique() {
        assert_ne!(codec().encode("t1", "u1"), codec().encode("t1", "u1"));
    }

    #[test]
    fn test_swapped_payload_is_rejected() {
        let codec = codec();
        let victim = codec.encode("victim-tenant", "u1");
        let attacker = codec.encode("attacker-tenant", "u1");

        let (_, victim_sig) = victim.split_once('.').unwrap();
        let (attacker_payload, _) = attacker.split_once('.').unwrap();
        let forged = format!("{attacker_payload}.{victim_sig}");

        assert!(is_invalid_state(codec.decode(&forged)));
    }

    #[test]
    fn test_unsigned_payload_is_rejected() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"tenant_id":"t1","user_id":"u1"}"#);
        assert!(is_invalid_state(codec().decode(&payload)));
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let other = StateCodec::new(&SecretString::new("other-secret".to_string())).unwrap();
        assert!(is_invalid_state(codec().decode(&other.encode("t1", "u1"))));
    }

    #[test]
    fn test_expired_state_is_rejected() {
        let codec = StateCodec::with_ttl(
            &SecretString::new("state-test-secret".to_string()),
            Duration::seconds(-1),
        )
        .unwrap();
        let state = codec.encode("t1", "u1");
        assert!(is_invalid_state(codec.decode(&state)));
    }

    #[test]
    fn test_signed_payload_missing_field_is_rejected() {
        let codec = codec();
        let sealed = codec.seal(br#"{"tenant_id":"t1","nonce":"00","iat":0}"#);
        assert!(is_invalid_state(codec.decode(&sealed)));
    }

    #[test]
    fn test_signed_payload_with_wrong_shape_is_rejected() {
        let codec = codec();
        let now = Utc::now().timestamp();

        let wrong_types = format!(r#"{{"tenant_id":1,"user_id":"u1","nonce":"00","iat":{now}}}"#);
        assert!(is_invalid_state(codec.decode(&codec.seal(wrong_types.as_bytes()))));

        let not_json = codec.seal(b"tenant=t1&user=u1");
        assert!(is_invalid_state(codec.decode(&not_json)));
    }

    #[test]
    fn test_signed_payload_with_empty_identity_is_rejected() {
        let codec = codec();
        let now = Utc::now().timestamp();
        let json = format!(r#"{{"tenant_id":"","user_id":"u1","nonce":"00","iat":{now}}}"#);
        assert!(is_invalid_state(codec.decode(&codec.seal(json.as_bytes()))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        for state in ["", ".", "abc", "abc.def", "!!!.???"] {
            assert!(is_invalid_state(codec().decode(state)), "{state} accepted");
        }
    }
}
