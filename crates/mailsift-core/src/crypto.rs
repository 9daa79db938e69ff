//! Field-level encryption for PII at rest.
//!
//! Individual sensitive values are encrypted with AES-256-GCM before they
//! reach the document store. A fresh 96-bit nonce is generated per
//! encryption and stored alongside the ciphertext; decryption fails closed
//! on any tampering with ciphertext, tag, or nonce.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Required key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes (96-bit GCM nonce).
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Result type alias for crypto operations.
pub type CryptoResult<T> = std::result::Result<T, EncryptionError>;

/// Crypto error types.
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    /// Key material has the wrong length. Startup must fail fast on this.
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required byte length.
        expected: usize,
        /// Provided byte length.
        actual: usize,
    },

    /// Key material is not valid hex.
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(#[from] hex::FromHexError),

    /// Stored field material (base64 or length) is malformed.
    #[error("Malformed encrypted field: {0}")]
    MalformedField(String),

    /// Authentication failed at decrypt time: wrong key, or tampered
    /// ciphertext/tag/nonce. No plaintext is returned.
    #[error("Decryption failed: authentication tag mismatch")]
    AuthenticationFailed,

    /// Encryption itself failed.
    #[error("Encryption failed")]
    EncryptFailed,
}

/// An encrypted field value as persisted in the document store.
///
/// All components are base64 encoded. The nonce is unique per encryption;
/// two encryptions of the same plaintext produce different fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedField {
    /// Base64 ciphertext (without the tag).
    pub ciphertext: String,
    /// Base64 GCM authentication tag.
    pub auth_tag: String,
    /// Base64 nonce used for this encryption.
    pub nonce: String,
}

/// Process-wide cipher for field-level encryption.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose key material through Debug.
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    /// Creates a cipher from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::InvalidKeyLength`] unless exactly
    /// [`KEY_LEN`] bytes are supplied.
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        if key.len() != KEY_LEN {
            return Err(EncryptionError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: key.len(),
            });
        }
        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        })
    }

    /// Creates a cipher from a hex-encoded key (64 hex characters), the
    /// form the key takes in configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or decodes to the
    /// wrong length.
    pub fn from_hex(hex_key: &str) -> CryptoResult<Self> {
        let key = hex::decode(hex_key.trim())?;
        Self::new(&key)
    }

    /// Encrypts a plaintext field with a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if the cipher rejects the input.
    pub fn encrypt_field(&self, plaintext: &str) -> CryptoResult<EncryptedField> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut combined = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::EncryptFailed)?;

        // AES-GCM appends the tag; persist it separately.
        let auth_tag = combined.split_off(combined.len() - TAG_LEN);

        Ok(EncryptedField {
            ciphertext: STANDARD.encode(&combined),
            auth_tag: STANDARD.encode(&auth_tag),
            nonce: STANDARD.encode(nonce_bytes),
        })
    }

    /// Decrypts a stored field.
    ///
    /// # Errors
    ///
    /// Fails closed: any tampering with ciphertext, tag, or nonce yields
    /// [`EncryptionError::AuthenticationFailed`] rather than corrupted
    /// plaintext.
    pub fn decrypt_field(&self, field: &EncryptedField) -> CryptoResult<String> {
        let ciphertext = decode_component(&field.ciphertext, "ciphertext")?;
        let auth_tag = decode_component(&field.auth_tag, "authTag")?;
        let nonce_bytes = decode_component(&field.nonce, "nonce")?;

        if auth_tag.len() != TAG_LEN {
            return Err(EncryptionError::MalformedField(format!(
                "auth tag must be {TAG_LEN} bytes, got {}",
                auth_tag.len()
            )));
        }
        if nonce_bytes.len() != NONCE_LEN {
            return Err(EncryptionError::MalformedField(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                nonce_bytes.len()
            )));
        }

        let mut combined = ciphertext;
        combined.extend_from_slice(&auth_tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), combined.as_ref())
            .map_err(|_| EncryptionError::AuthenticationFailed)?;

        String::from_utf8(plaintext)
            .map_err(|e| EncryptionError::MalformedField(format!("plaintext not UTF-8: {e}")))
    }
}

fn decode_component(encoded: &str, name: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| EncryptionError::MalformedField(format!("{name} is not valid base64: {e}")))
}
