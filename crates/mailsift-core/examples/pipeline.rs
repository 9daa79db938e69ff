//! End-to-end pipeline demo against in-memory collaborators.
//!
//! Run with: `cargo run --example pipeline -p mailsift-core`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tokio::sync::Mutex;

use mailsift_core::{
    CredentialGate, CredentialResult, DocumentStore, EmailId, EncryptedField, FieldCipher,
    Pipeline, ProcessedEmail, ProcessingQueue, QueueConfig, StoreError, TokenStore, UserId,
};
use mailsift_provider::{AttachmentBody, FetchedMessage, MailApi, TextGenApi};
use mailsift_mime::{MessagePart, PartBody, PartHeader};

struct MemoryTokenStore {
    tokens: HashMap<UserId, EncryptedField>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self, user_id: &UserId) -> CredentialResult<Option<EncryptedField>> {
        Ok(self.tokens.get(user_id).cloned())
    }
}

struct DemoMail;

#[async_trait]
impl MailApi for DemoMail {
    async fn fetch_message(
        &self,
        _access_token: &str,
        email_id: &str,
    ) -> mailsift_provider::Result<FetchedMessage> {
        let body = "Hi, your May invoice is attached. Payment is due Friday.";
        Ok(FetchedMessage {
            id: email_id.to_owned(),
            snippet: String::new(),
            payload: MessagePart {
                part_id: "0".to_owned(),
                mime_type: Some("multipart/mixed".to_owned()),
                headers: vec![
                    PartHeader {
                        name: "From".to_owned(),
                        value: "Acme Billing <billing@acme.example>".to_owned(),
                    },
                    PartHeader {
                        name: "To".to_owned(),
                        value: "dana@example.com".to_owned(),
                    },
                    PartHeader {
                        name: "Date".to_owned(),
                        value: "Wed, 1 May 2024 10:00:00 +0000".to_owned(),
                    },
                ],
                parts: vec![
                    MessagePart {
                        part_id: "1".to_owned(),
                        mime_type: Some("text/plain".to_owned()),
                        body: Some(PartBody {
                            data: Some(URL_SAFE_NO_PAD.encode(body)),
                            attachment_id: None,
                            size: body.len() as u64,
                        }),
                        ..MessagePart::default()
                    },
                    MessagePart {
                        part_id: "2".to_owned(),
                        mime_type: Some("application/pdf".to_owned()),
                        filename: Some("invoice.pdf".to_owned()),
                        body: Some(PartBody {
                            data: None,
                            attachment_id: Some("A1".to_owned()),
                            size: 52_133,
                        }),
                        ..MessagePart::default()
                    },
                ],
                ..MessagePart::default()
            },
        })
    }

    async fn fetch_attachment(
        &self,
        _access_token: &str,
        _email_id: &str,
        attachment_ref: &str,
    ) -> mailsift_provider::Result<AttachmentBody> {
        Err(mailsift_provider::Error::NotFound(attachment_ref.to_owned()))
    }
}

struct DemoTextGen;

#[async_trait]
impl TextGenApi for DemoTextGen {
    async fn generate(&self, _prompt: &str) -> mailsift_provider::Result<String> {
        Ok("Summary: Acme invoice for May is due Friday.\n\
            Urgency Score: 75\n\
            Action: Review invoice\n\
            Classification: Work-Related\n\
            Keywords: invoice, payment, deadline, billing, acme\n\
            ExtractedEntities: {\"senderName\": \"Acme Billing\", \
            \"recipientNames\": [\"Dana\"], \"subjectTerms\": [\"invoice\"], \
            \"date\": \"2024-05-01\", \"attachmentNames\": [\"invoice.pdf\"], \
            \"snippet\": \"your May invoice is attached\"}"
            .to_owned())
    }
}

#[derive(Default)]
struct MemoryStore {
    records: Mutex<Vec<ProcessedEmail>>,
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn save_processed(&self, record: &ProcessedEmail) -> Result<(), StoreError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mailsift_core=debug".into()),
        )
        .init();

    let cipher = FieldCipher::new(&[42u8; mailsift_core::KEY_LEN])?;
    let user = UserId::from("demo-user");

    let mut tokens = HashMap::new();
    tokens.insert(user.clone(), cipher.encrypt_field("demo-access-token")?);

    let pipeline = Pipeline::new(
        CredentialGate::new(Arc::new(MemoryTokenStore { tokens }), cipher.clone()),
        Arc::new(DemoMail),
        Arc::new(DemoTextGen),
        Arc::new(MemoryStore::default()),
        cipher.clone(),
    );
    let queue = ProcessingQueue::new(pipeline, QueueConfig::default());

    queue.enqueue(user.clone(), EmailId::from("msg-001")).await;
    queue.enqueue(user, EmailId::from("msg-001")).await; // deduplicated

    while queue.stats().await.is_active {
        queue.tick().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let stats = queue.stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    queue.shutdown().await;
    Ok(())
}
