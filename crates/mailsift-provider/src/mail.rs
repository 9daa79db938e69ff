//! Mail provider client: fetch a full message or an attachment body.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use tracing::debug;

use mailsift_mime::MessagePart;

use crate::error::{Error, Result, from_response};

/// Default mail provider endpoint.
pub const DEFAULT_MAIL_ENDPOINT: &str = "https://gmail.googleapis.com/gmail/v1";

/// A fetched message: the root part tree plus a short preview string.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    /// Provider message identifier.
    pub id: String,
    /// Short provider-supplied preview of the body.
    pub snippet: String,
    /// Root of the message part tree.
    pub payload: MessagePart,
}

/// Decoded attachment body fetched on demand.
#[derive(Debug, Clone)]
pub struct AttachmentBody {
    /// Raw attachment bytes.
    pub data: Vec<u8>,
    /// MIME type reported by the provider.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
}

/// Read access to the mail provider, keyed by a per-user access token.
#[async_trait]
pub trait MailApi: Send + Sync {
    /// Fetches a full message by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is absent, the token is rejected, or
    /// the provider fails.
    async fn fetch_message(&self, access_token: &str, email_id: &str) -> Result<FetchedMessage>;

    /// Fetches a large attachment body by `(email_id, attachment_ref)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the attachment is absent, the token is rejected,
    /// or the provider fails.
    async fn fetch_attachment(
        &self,
        access_token: &str,
        email_id: &str,
        attachment_ref: &str,
    ) -> Result<AttachmentBody>;
}

/// `reqwest`-backed mail provider client.
#[derive(Debug, Clone)]
pub struct HttpMailClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMailClient {
    /// Creates a client against the default provider endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_MAIL_ENDPOINT)
    }

    /// Creates a client against a custom endpoint (used by tests).
    #[must_use]
    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: endpoint.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(from_response(response).await)
        }
    }
}

impl Default for HttpMailClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire shape of a fetched message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageResponse {
    id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<MessagePart>,
}

/// Wire shape of an attachment body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachmentResponse {
    #[serde(default)]
    data: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    size: u64,
}

#[async_trait]
impl MailApi for HttpMailClient {
    async fn fetch_message(&self, access_token: &str, email_id: &str) -> Result<FetchedMessage> {
        debug!(email_id, "fetching message");
        let response: MessageResponse = self
            .get_json(
                access_token,
                &format!("users/me/messages/{email_id}"),
                &[("format", "full")],
            )
            .await?;

        let payload = response
            .payload
            .ok_or_else(|| Error::Decode(format!("message {email_id} has no payload")))?;

        Ok(FetchedMessage {
            id: response.id,
            snippet: response.snippet,
            payload,
        })
    }

    async fn fetch_attachment(
        &self,
        access_token: &str,
        email_id: &str,
        attachment_ref: &str,
    ) -> Result<AttachmentBody> {
        debug!(email_id, attachment_ref, "fetching attachment body");
        let response: AttachmentResponse = self
            .get_json(
                access_token,
                &format!("users/me/messages/{email_id}/attachments/{attachment_ref}"),
                &[],
            )
            .await?;

        let data = URL_SAFE_NO_PAD
            .decode(&response.data)
            .map_err(|e| Error::Decode(format!("attachment {attachment_ref}: {e}")))?;

        Ok(AttachmentBody {
            data,
            mime_type: response.mime_type,
            size: response.size,
        })
    }
}
