//! Classification result data models.

use serde::{Deserialize, Serialize};

/// Fixed classification vocabulary.
///
/// Wire names are case-sensitive; `WorkRelated` is `Work-Related` on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Marketing and bulk promotional mail.
    Promotional,
    /// Automated notifications (alerts, reminders, social updates).
    Notification,
    /// Receipts, confirmations, invoices, account activity.
    Transactional,
    /// Mail from real people, personal in nature.
    Personal,
    /// Work-related correspondence.
    #[serde(rename = "Work-Related")]
    WorkRelated,
    /// Unsolicited or malicious mail.
    Spam,
}

impl Category {
    /// All vocabulary values, in prompt order.
    pub const ALL: [Self; 6] = [
        Self::Promotional,
        Self::Notification,
        Self::Transactional,
        Self::Personal,
        Self::WorkRelated,
        Self::Spam,
    ];

    /// Parses the exact, case-sensitive wire name.
    #[must_use]
    pub fn parse_exact(s: &str) -> Option<Self> {
        match s {
            "Promotional" => Some(Self::Promotional),
            "Notification" => Some(Self::Notification),
            "Transactional" => Some(Self::Transactional),
            "Personal" => Some(Self::Personal),
            "Work-Related" => Some(Self::WorkRelated),
            "Spam" => Some(Self::Spam),
            _ => None,
        }
    }

    /// Wire name for this category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Promotional => "Promotional",
            Self::Notification => "Notification",
            Self::Transactional => "Transactional",
            Self::Personal => "Personal",
            Self::WorkRelated => "Work-Related",
            Self::Spam => "Spam",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured entities extracted from an email.
///
/// Empty strings and empty lists are valid for emails that lack the
/// corresponding detail (e.g. no attachments).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEntities {
    /// Display name of the sender.
    #[serde(default)]
    pub sender_name: String,
    /// Display names of the recipients.
    #[serde(default)]
    pub recipient_names: Vec<String>,
    /// Salient terms from the subject.
    #[serde(default)]
    pub subject_terms: Vec<String>,
    /// ISO date of the email.
    #[serde(default)]
    pub date: String,
    /// Attachment filenames.
    #[serde(default)]
    pub attachment_names: Vec<String>,
    /// Short content snippet.
    #[serde(default)]
    pub snippet: String,
}

/// The structured record produced per classified email.
///
/// All fields are required; a reply that cannot fill every field is rejected
/// as malformed rather than persisted partially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// One-sentence summary.
    pub summary: String,
    /// Urgency score in [1,100].
    pub urgency_score: u8,
    /// Suggested action, imperative, 2-4 words.
    pub action: String,
    /// Assigned category.
    pub classification: Category,
    /// Ordered keywords.
    pub keywords: Vec<String>,
    /// Extracted entities.
    pub extracted_entities: ExtractedEntities,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for category in Category::ALL {
            assert_eq!(Category::parse_exact(category.as_str()), Some(category));
        }
    }

    #[test]
    fn test_category_parse_is_case_sensitive() {
        assert!(Category::parse_exact("promotional").is_none());
        assert!(Category::parse_exact("SPAM").is_none());
        assert!(Category::parse_exact("work-related").is_none());
    }

    #[test]
    fn test_work_related_wire_name() {
        let json = serde_json::to_string(&Category::WorkRelated).unwrap();
        assert_eq!(json, "\"Work-Related\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::WorkRelated);
    }

    #[test]
    fn test_entities_camel_case_serialization() {
        let entities = ExtractedEntities {
            sender_name: "Acme Billing".to_string(),
            ..ExtractedEntities::default()
        };
        let json = serde_json::to_string(&entities).unwrap();
        assert!(json.contains("\"senderName\""));
        assert!(json.contains("\"attachmentNames\""));
    }
}
