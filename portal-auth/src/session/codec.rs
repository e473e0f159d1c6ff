//! HMAC-SHA256 signing and verification of session tokens.

use std::fmt;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use secrecy::{ExposeSecret, SecretString};

use super::SessionClaims;
use crate::error::{session_error, Error, ErrorKind, SessionErrorKind};

/// Signs and verifies compact session tokens with a symmetric secret.
///
/// Tokens are never stored server-side. A signed, unexpired token is always valid:
/// there is no revocation list and logout is the client discarding its token.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec from the process-wide signing secret.
    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `claims` into a token string.
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Session(SessionErrorKind::SigningFailed),
        })
    }

    /// Verify a token and return its claims.
    ///
    /// Malformed encoding, a signature mismatch and an expiry in the past all produce
    /// the same `InvalidOrExpired` error so callers cannot tell them apart.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, Error> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Session token rejected: {:?}", e.kind());
                session_error(SessionErrorKind::InvalidOrExpired, "invalid session token")
            })
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}
