//! AES-256-GCM encryption of provider tokens stored at rest.
//!
//! The key is 32 bytes supplied as a hex string (64 characters). Ciphertexts are
//! `base64(nonce || ciphertext)` so they fit a text column.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{Error, ErrorKind, StorageErrorKind};

/// 12-byte nonce size for AES-GCM
const NONCE_SIZE: usize = 12;

fn storage_err(kind: StorageErrorKind) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Storage(kind),
    }
}

/// Encrypts and decrypts token values with a process-wide key.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Build a cipher from a hex-encoded 32-byte key.
    pub fn from_hex(key_hex: &SecretString) -> Result<Self, Error> {
        let bytes = hex::decode(key_hex.expose_secret().trim()).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Storage(StorageErrorKind::EncryptionFailed),
        })?;
        if bytes.len() != 32 {
            return Err(storage_err(StorageErrorKind::EncryptionFailed));
        }

        let cipher = Aes256Gcm::new_from_slice(&bytes)
            .map_err(|_| storage_err(StorageErrorKind::EncryptionFailed))?;
        Ok(Self { cipher })
    }

    /// Encrypt with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &SecretString) -> Result<String, Error> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.expose_secret().as_bytes())
            .map_err(|_| storage_err(StorageErrorKind::EncryptionFailed))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend(ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt a value produced by `encrypt`.
    pub fn decrypt(&self, ciphertext_b64: &str) -> Result<SecretString, Error> {
        let combined = BASE64.decode(ciphertext_b64).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Storage(StorageErrorKind::DecryptionFailed),
        })?;

        if combined.len() < NONCE_SIZE {
            return Err(storage_err(StorageErrorKind::DecryptionFailed));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| storage_err(StorageErrorKind::DecryptionFailed))?;

        String::from_utf8(plaintext)
            .map(SecretString::new)
            .map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Storage(StorageErrorKind::DecryptionFailed),
            })
    }

    pub fn encrypt_optional(
        &self,
        plaintext: Option<&SecretString>,
    ) -> Result<Option<String>, Error> {
        plaintext.map(|value| self.encrypt(value)).transpose()
    }

    pub fn decrypt_optional(&self, ciphertext: Option<&str>) -> Result<Option<SecretString>, Error> {
        ciphertext.map(|value| self.decrypt(value)).transpose()
    }
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCipher").finish_non_exhaustive()
    }
}
