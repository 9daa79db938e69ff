//! Classification request model and prompt construction.

use crate::result::Category;

/// Everything the prompt needs about one email.
///
/// Built once per email, immutable, discarded after the provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    /// Sender address (and display name where available).
    pub sender: String,
    /// Recipient addresses.
    pub recipients: Vec<String>,
    /// Whether the message advertises an unsubscribe link.
    pub has_unsubscribe_link: bool,
    /// Attachment filenames.
    pub attachment_names: Vec<String>,
    /// Formatted date string.
    pub date: String,
    /// Plain body text.
    pub body: String,
}

/// Builds the classification prompt for a request.
///
/// Pure template substitution: identical requests always produce
/// byte-identical prompts, so the output is safe to cache and trivial to
/// test against.
#[must_use]
pub fn build_prompt(request: &ClassificationRequest) -> String {
    let recipients = request.recipients.join(", ");
    let attachments = if request.attachment_names.is_empty() {
        "(none)".to_string()
    } else {
        request.attachment_names.join(", ")
    };
    let unsubscribe = if request.has_unsubscribe_link {
        "yes"
    } else {
        "no"
    };
    let vocabulary = Category::ALL.map(|c| c.as_str()).join(", ");

    format!(
        "You are an email triage assistant. Classify the email below.\n\
         Respond with exactly six labeled segments, in this order, and nothing else:\n\
         \n\
         Summary: <one sentence>\n\
         Urgency Score: <integer between 1 and 100>\n\
         Action: <imperative phrase, 2-4 words>\n\
         Classification: <exactly one of: {vocabulary}>\n\
         Keywords: <5-10 comma-separated keywords>\n\
         ExtractedEntities: <flat JSON object with keys senderName, recipientNames, \
         subjectTerms, date, attachmentNames, snippet>\n\
         \n\
         Scoring rules:\n\
         - Promotional and bulk senders score below 30 even if the wording implies urgency.\n\
         - Only actionable, deadline-bound, or sender-trusted content scores 60 or above.\n\
         - Use the classification vocabulary exactly as written, including capitalization.\n\
         - Never surface personally identifying detail beyond the structured fields above.\n\
         \n\
         Email:\n\
         From: {sender}\n\
         To: {recipients}\n\
         Date: {date}\n\
         Unsubscribe link present: {unsubscribe}\n\
         Attachments: {attachments}\n\
         Body:\n\
         {body}\n",
        sender = request.sender,
        date = request.date,
        body = request.body,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> ClassificationRequest {
        ClassificationRequest {
            sender: "Acme Billing <billing@acme.example>".to_string(),
            recipients: vec!["user@example.com".to_string()],
            has_unsubscribe_link: false,
            attachment_names: vec!["invoice.pdf".to_string()],
            date: "2026-08-29".to_string(),
            body: "Your invoice is due Friday.".to_string(),
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let req = request();
        assert_eq!(build_prompt(&req), build_prompt(&req));
    }

    #[test]
    fn test_prompt_interpolates_fields() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("From: Acme Billing <billing@acme.example>"));
        assert!(prompt.contains("To: user@example.com"));
        assert!(prompt.contains("Unsubscribe link present: no"));
        assert!(prompt.contains("Attachments: invoice.pdf"));
        assert!(prompt.contains("Your invoice is due Friday."));
    }

    #[test]
    fn test_prompt_lists_full_vocabulary() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains(
            "Promotional, Notification, Transactional, Personal, Work-Related, Spam"
        ));
    }

    #[test]
    fn test_empty_attachments_render_as_none() {
        let mut req = request();
        req.attachment_names.clear();
        req.has_unsubscribe_link = true;
        let prompt = build_prompt(&req);
        assert!(prompt.contains("Attachments: (none)"));
        assert!(prompt.contains("Unsubscribe link present: yes"));
    }
}
