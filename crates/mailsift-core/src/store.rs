//! Persistence of processed-email records.
//!
//! The pipeline produces one [`ProcessedEmail`] per message. Personally
//! identifying entity fields are encrypted before a record ever reaches the
//! store; raw message bodies are never persisted at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mailsift_classify::{Category, ClassificationResult, ExtractedEntities};

use crate::crypto::{EncryptedField, EncryptionError, FieldCipher};
use crate::ids::{EmailId, UserId};

/// Error type for document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store rejected or failed the write.
    #[error("Document store error: {0}")]
    Backend(String),
}

/// Write access to the processed-email document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists one processed-email record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    async fn save_processed(&self, record: &ProcessedEmail) -> Result<(), StoreError>;
}

/// Extracted entities as persisted: identifying fields encrypted, the rest
/// stored in the clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntities {
    /// Encrypted sender display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<EncryptedField>,
    /// Encrypted JSON array of recipient names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_names: Option<EncryptedField>,
    /// Encrypted snippet text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<EncryptedField>,
    /// Subject terms, stored in the clear.
    #[serde(default)]
    pub subject_terms: Vec<String>,
    /// Message date, stored in the clear.
    #[serde(default)]
    pub date: String,
    /// Attachment file names, stored in the clear.
    #[serde(default)]
    pub attachment_names: Vec<String>,
}

impl StoredEntities {
    /// Encrypts the identifying fields of extracted entities.
    ///
    /// Empty strings and empty lists are stored as absent rather than as
    /// ciphertext over nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    pub fn encrypt(entities: &ExtractedEntities, cipher: &FieldCipher) -> Result<Self, EncryptionError> {
        let sender_name = if entities.sender_name.is_empty() {
            None
        } else {
            Some(cipher.encrypt_field(&entities.sender_name)?)
        };

        let recipient_names = if entities.recipient_names.is_empty() {
            None
        } else {
            let json = serde_json::to_string(&entities.recipient_names)
                .map_err(|e| EncryptionError::MalformedField(e.to_string()))?;
            Some(cipher.encrypt_field(&json)?)
        };

        let snippet = if entities.snippet.is_empty() {
            None
        } else {
            Some(cipher.encrypt_field(&entities.snippet)?)
        };

        Ok(Self {
            sender_name,
            recipient_names,
            snippet,
            subject_terms: entities.subject_terms.clone(),
            date: entities.date.clone(),
            attachment_names: entities.attachment_names.clone(),
        })
    }

    /// Decrypts a stored record back into plain extracted entities.
    ///
    /// # Errors
    ///
    /// Returns an error if any encrypted field fails authentication or the
    /// recipient list is not valid JSON.
    pub fn decrypt(&self, cipher: &FieldCipher) -> Result<ExtractedEntities, EncryptionError> {
        let sender_name = match &self.sender_name {
            Some(field) => cipher.decrypt_field(field)?,
            None => String::new(),
        };

        let recipient_names = match &self.recipient_names {
            Some(field) => {
                let json = cipher.decrypt_field(field)?;
                serde_json::from_str(&json)
                    .map_err(|e| EncryptionError::MalformedField(e.to_string()))?
            }
            None => Vec::new(),
        };

        let snippet = match &self.snippet {
            Some(field) => cipher.decrypt_field(field)?,
            None => String::new(),
        };

        Ok(ExtractedEntities {
            sender_name,
            recipient_names,
            subject_terms: self.subject_terms.clone(),
            date: self.date.clone(),
            attachment_names: self.attachment_names.clone(),
            snippet,
        })
    }
}

/// One fully processed email, ready for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedEmail {
    /// Provider message identifier.
    pub email_id: EmailId,
    /// Owning user.
    pub user_id: UserId,
    /// One-sentence summary.
    pub summary: String,
    /// Urgency score in 1..=100.
    pub urgency_score: u8,
    /// Suggested action.
    pub action: String,
    /// Assigned category.
    pub classification: Category,
    /// Topical keywords.
    pub keywords: Vec<String>,
    /// Entities, with identifying fields encrypted.
    pub entities: StoredEntities,
    /// When processing completed.
    pub processed_at: DateTime<Utc>,
}

impl ProcessedEmail {
    /// Builds a persistable record from a classification result, encrypting
    /// the identifying entity fields.
    ///
    /// # Errors
    ///
    /// Returns an error if entity encryption fails.
    pub fn from_result(
        email_id: EmailId,
        user_id: UserId,
        result: &ClassificationResult,
        cipher: &FieldCipher,
    ) -> Result<Self, EncryptionError> {
        Ok(Self {
            email_id,
            user_id,
            summary: result.summary.clone(),
            urgency_score: result.urgency_score,
            action: result.action.clone(),
            classification: result.classification,
            keywords: result.keywords.clone(),
            entities: StoredEntities::encrypt(&result.extracted_entities, cipher)?,
            processed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;

    fn cipher() -> FieldCipher {
        FieldCipher::new(&[3u8; KEY_LEN]).unwrap()
    }

    fn sample_entities() -> ExtractedEntities {
        ExtractedEntities {
            sender_name: "Acme Billing".into(),
            recipient_names: vec!["Dana".into(), "Lee".into()],
            subject_terms: vec!["invoice".into()],
            date: "2024-05-01".into(),
            attachment_names: vec!["invoice.pdf".into()],
            snippet: "Hello, your invoice is attached".into(),
        }
    }

    #[test]
    fn test_identifying_fields_are_not_plaintext() {
        let cipher = cipher();
        let stored = StoredEntities::encrypt(&sample_entities(), &cipher).unwrap();

        let json = serde_json::to_string(&stored).unwrap();
        assert!(!json.contains("Acme Billing"));
        assert!(!json.contains("Dana"));
        assert!(!json.contains("your invoice is attached"));
        // Non-identifying fields stay readable.
        assert!(json.contains("invoice.pdf"));
        assert!(json.contains("2024-05-01"));
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let cipher = cipher();
        let original = sample_entities();
        let stored = StoredEntities::encrypt(&original, &cipher).unwrap();
        let recovered = stored.decrypt(&cipher).unwrap();

        assert_eq!(recovered.sender_name, original.sender_name);
        assert_eq!(recovered.recipient_names, original.recipient_names);
        assert_eq!(recovered.snippet, original.snippet);
        assert_eq!(recovered.subject_terms, original.subject_terms);
    }

    #[test]
    fn test_empty_fields_stored_absent() {
        let cipher = cipher();
        let stored = StoredEntities::encrypt(&ExtractedEntities::default(), &cipher).unwrap();
        assert!(stored.sender_name.is_none());
        assert!(stored.recipient_names.is_none());
        assert!(stored.snippet.is_none());

        let recovered = stored.decrypt(&cipher).unwrap();
        assert!(recovered.sender_name.is_empty());
        assert!(recovered.recipient_names.is_empty());
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let stored = StoredEntities::encrypt(&sample_entities(), &cipher()).unwrap();
        let other = FieldCipher::new(&[9u8; KEY_LEN]).unwrap();
        assert!(stored.decrypt(&other).is_err());
    }
}
