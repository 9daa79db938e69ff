//! Credential gate: resolve a usable mail-provider access token for a user.
//!
//! Tokens are stored encrypted at rest. A missing or undecryptable token is
//! a distinct outcome from any network failure, because the remedial action
//! differs: the user must re-authenticate.

use std::sync::Arc;

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::crypto::{EncryptedField, EncryptionError, FieldCipher};
use crate::ids::UserId;

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailsift";

/// Credential type identifier for mail-provider `OAuth2` tokens.
const OAUTH_TOKEN_CREDENTIAL: &str = "oauth_token";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// No token is stored for this user; re-authentication is required.
    #[error("No access token stored for user {0}")]
    Missing(UserId),

    /// The stored token could not be decrypted; re-authentication is
    /// required.
    #[error("Stored access token could not be decrypted: {0}")]
    Decrypt(#[from] EncryptionError),

    /// The token store itself failed.
    #[error("Token store error: {0}")]
    Store(String),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Read access to the per-user encrypted token store.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Loads the encrypted access token for a user, or `None` if the user
    /// has never connected their account.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    async fn load(&self, user_id: &UserId) -> CredentialResult<Option<EncryptedField>>;
}

/// Resolves usable access tokens by combining the token store with the
/// process-wide field cipher.
#[derive(Clone)]
pub struct CredentialGate {
    store: Arc<dyn TokenStore>,
    cipher: FieldCipher,
}

impl CredentialGate {
    /// Creates a gate over a token store.
    pub fn new(store: Arc<dyn TokenStore>, cipher: FieldCipher) -> Self {
        Self { store, cipher }
    }

    /// Resolves a decrypted access token for a user.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Missing`] when no token is stored and
    /// [`CredentialError::Decrypt`] when the stored token fails
    /// authentication; both mean the user must reconnect their account.
    pub async fn resolve_access_token(&self, user_id: &UserId) -> CredentialResult<String> {
        let field = self
            .store
            .load(user_id)
            .await?
            .ok_or_else(|| CredentialError::Missing(user_id.clone()))?;

        match self.cipher.decrypt_field(&field) {
            Ok(token) => {
                debug!(user = %user_id, "resolved access token");
                Ok(token)
            }
            Err(e) => {
                warn!(user = %user_id, error = %e, "stored access token failed decryption");
                Err(e.into())
            }
        }
    }
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate").finish_non_exhaustive()
    }
}

/// Token store backed by the system keyring.
///
/// Stores the serialized [`EncryptedField`] under a per-user entry:
/// - Linux: Secret Service (GNOME Keyring, `KWallet`)
/// - macOS: Keychain
/// - Windows: Credential Manager
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    /// Generates the keyring entry key for a user's token.
    fn entry_key(user_id: &UserId) -> String {
        format!("{SERVICE_NAME}_{OAUTH_TOKEN_CREDENTIAL}_{user_id}")
    }

    /// Stores an encrypted token for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyring operation fails.
    pub fn store_token(user_id: &UserId, field: &EncryptedField) -> CredentialResult<()> {
        let key = Self::entry_key(user_id);
        let entry = Entry::new(SERVICE_NAME, &key).map_err(|e| CredentialError::Store(e.to_string()))?;
        let serialized =
            serde_json::to_string(field).map_err(|e| CredentialError::Store(e.to_string()))?;
        entry
            .set_password(&serialized)
            .map_err(|e| CredentialError::Store(e.to_string()))?;
        debug!(user = %user_id, "stored encrypted access token");
        Ok(())
    }

    /// Deletes the stored token for a user. Missing entries are not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyring operation fails.
    pub fn delete_token(user_id: &UserId) -> CredentialResult<()> {
        let key = Self::entry_key(user_id);
        let entry = Entry::new(SERVICE_NAME, &key).map_err(|e| CredentialError::Store(e.to_string()))?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::Store(e.to_string())),
        }
    }
}

#[async_trait]
impl TokenStore for KeyringTokenStore {
    async fn load(&self, user_id: &UserId) -> CredentialResult<Option<EncryptedField>> {
        let key = Self::entry_key(user_id);
        let entry = Entry::new(SERVICE_NAME, &key).map_err(|e| CredentialError::Store(e.to_string()))?;
        match entry.get_password() {
            Ok(serialized) => {
                let field = serde_json::from_str(&serialized)
                    .map_err(|e| CredentialError::Store(e.to_string()))?;
                Ok(Some(field))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(user = %user_id, "no access token stored");
                Ok(None)
            }
            Err(e) => Err(CredentialError::Store(e.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory token store used across the queue tests too.
    #[derive(Default)]
    struct MemoryTokenStore {
        tokens: Mutex<HashMap<UserId, EncryptedField>>,
    }

    #[async_trait]
    impl TokenStore for MemoryTokenStore {
        async fn load(&self, user_id: &UserId) -> CredentialResult<Option<EncryptedField>> {
            Ok(self.tokens.lock().await.get(user_id).cloned())
        }
    }

    fn cipher() -> FieldCipher {
        FieldCipher::new(&[7u8; crate::crypto::KEY_LEN]).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_returns_decrypted_token() {
        let store = Arc::new(MemoryTokenStore::default());
        let cipher = cipher();
        let user = UserId::from("u1");
        store.tokens.lock().await.insert(
            user.clone(),
            cipher.encrypt_field("ya29.secret-token").unwrap(),
        );

        let gate = CredentialGate::new(store, cipher);
        let token = gate.resolve_access_token(&user).await.unwrap();
        assert_eq!(token, "ya29.secret-token");
    }

    #[tokio::test]
    async fn test_missing_token_is_distinct() {
        let gate = CredentialGate::new(Arc::new(MemoryTokenStore::default()), cipher());
        let err = gate
            .resolve_access_token(&UserId::from("nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Missing(_)));
    }

    #[tokio::test]
    async fn test_undecryptable_token_is_distinct() {
        let store = Arc::new(MemoryTokenStore::default());
        let user = UserId::from("u1");
        // Encrypted under a different key.
        let other = FieldCipher::new(&[9u8; crate::crypto::KEY_LEN]).unwrap();
        store
            .tokens
            .lock()
            .await
            .insert(user.clone(), other.encrypt_field("token").unwrap());

        let gate = CredentialGate::new(store, cipher());
        let err = gate.resolve_access_token(&user).await.unwrap_err();
        assert!(matches!(err, CredentialError::Decrypt(_)));
    }
}
