//! The per-email processing pipeline: fetch, extract, classify, persist.

use std::sync::Arc;

use tracing::{debug, info};

use mailsift_classify::{build_prompt, parse_response, ClassificationRequest, ClassificationResult};
use mailsift_mime::{extract, AttachmentContent, AttachmentDescriptor, ExtractedContent};
use mailsift_provider::{FetchedMessage, MailApi, TextGenApi};

use crate::credentials::CredentialGate;
use crate::crypto::FieldCipher;
use crate::error::Result;
use crate::ids::{EmailId, UserId};
use crate::store::{DocumentStore, ProcessedEmail};

/// Owns the collaborators needed to take one email from provider identifier
/// to persisted record.
///
/// Cheap to clone; every worker in the processing queue holds one.
#[derive(Clone)]
pub struct Pipeline {
    gate: CredentialGate,
    mail: Arc<dyn MailApi>,
    textgen: Arc<dyn TextGenApi>,
    store: Arc<dyn DocumentStore>,
    cipher: FieldCipher,
}

impl Pipeline {
    /// Assembles a pipeline from its collaborators.
    pub fn new(
        gate: CredentialGate,
        mail: Arc<dyn MailApi>,
        textgen: Arc<dyn TextGenApi>,
        store: Arc<dyn DocumentStore>,
        cipher: FieldCipher,
    ) -> Self {
        Self {
            gate,
            mail,
            textgen,
            store,
            cipher,
        }
    }

    /// Fetch stage: resolves the user's token, fetches the message, and
    /// extracts the classifier input.
    ///
    /// Raw message bodies live only inside the returned [`PreparedEmail`];
    /// they never reach the document store.
    ///
    /// # Errors
    ///
    /// Returns an error on credential, provider, or extraction failure.
    pub async fn prepare(&self, user_id: &UserId, email_id: &EmailId) -> Result<PreparedEmail> {
        let token = self.gate.resolve_access_token(user_id).await?;
        let message = self.mail.fetch_message(&token, email_id.as_str()).await?;
        let content = extract(&message.payload, &message.snippet)?;
        debug!(
            email = %email_id,
            body_len = content.body_text.len(),
            attachments = content.attachments.len(),
            "extracted message content"
        );
        let request = classification_request(&message, &content);
        Ok(PreparedEmail {
            request,
            attachments: content.attachments,
        })
    }

    /// Classify stage: builds the prompt, calls the text-generation
    /// provider, and parses the reply.
    ///
    /// # Errors
    ///
    /// Returns an error on provider failure or an unparseable reply.
    pub async fn classify(&self, prepared: &PreparedEmail) -> Result<ClassificationResult> {
        let reply = self.textgen.generate(&build_prompt(&prepared.request)).await?;
        let result = parse_response(&reply)?;
        info!(
            classification = %result.classification,
            urgency = result.urgency_score,
            "classified email"
        );
        Ok(result)
    }

    /// Persist stage: encrypts identifying entity fields and writes the
    /// record to the document store.
    ///
    /// # Errors
    ///
    /// Returns an error on encryption or store failure.
    pub async fn persist(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
        result: &ClassificationResult,
    ) -> Result<ProcessedEmail> {
        let record =
            ProcessedEmail::from_result(email_id.clone(), user_id.clone(), result, &self.cipher)?;
        self.store.save_processed(&record).await?;
        Ok(record)
    }

    /// Processes one email end to end: fetch, classify, persist.
    ///
    /// # Errors
    ///
    /// Returns the first stage error. [`crate::Error::disposition`] tells
    /// the caller whether the failure is worth retrying.
    pub async fn process(&self, user_id: &UserId, email_id: &EmailId) -> Result<ProcessedEmail> {
        let prepared = self.prepare(user_id, email_id).await?;
        let result = self.classify(&prepared).await?;
        self.persist(user_id, email_id, &result).await
    }

    /// Resolves the bytes of an attachment: inline content is returned
    /// directly, referenced content triggers a second provider fetch.
    ///
    /// # Errors
    ///
    /// Returns an error on credential or provider failure.
    pub async fn attachment_bytes(
        &self,
        user_id: &UserId,
        email_id: &EmailId,
        attachment: &AttachmentDescriptor,
    ) -> Result<Vec<u8>> {
        match &attachment.content {
            AttachmentContent::Inline(data) => Ok(data.clone()),
            AttachmentContent::Reference(attachment_ref) => {
                let token = self.gate.resolve_access_token(user_id).await?;
                let body = self
                    .mail
                    .fetch_attachment(&token, email_id.as_str(), attachment_ref)
                    .await?;
                Ok(body.data)
            }
        }
    }
}

/// Output of the fetch stage: everything the classify stage needs, plus the
/// attachments located by the walker for download on demand.
#[derive(Debug, Clone)]
pub struct PreparedEmail {
    /// Classifier input derived from headers and extracted content.
    pub request: ClassificationRequest,
    /// Attachments in document order.
    pub attachments: Vec<AttachmentDescriptor>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

/// Derives the classifier input from the fetched message and its extracted
/// content.
fn classification_request(
    message: &FetchedMessage,
    content: &ExtractedContent,
) -> ClassificationRequest {
    let payload = &message.payload;
    let sender = payload.header("From").unwrap_or_default().to_owned();
    let recipients = payload
        .header("To")
        .map(split_addresses)
        .unwrap_or_default();
    let date = payload.header("Date").unwrap_or_default().to_owned();

    // The unsubscribe signal comes from either the standard header or the
    // word appearing in the body.
    let has_unsubscribe_link = payload.header("List-Unsubscribe").is_some()
        || content.body_text.to_ascii_lowercase().contains("unsubscribe");

    ClassificationRequest {
        sender,
        recipients,
        has_unsubscribe_link,
        attachment_names: content
            .attachments
            .iter()
            .map(|a| a.filename.clone())
            .collect(),
        date,
        body: content.body_text.clone(),
    }
}

fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
