//! Message model for a single send request.

use serde::{Deserialize, Serialize};

/// An email to send, as described by the caller.
///
/// Mutated in place by the hydrator and the body resolver, then consumed by
/// a transport. All fields are optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    /// Sender address, bare or `"Name <addr>"`.
    pub from: String,
    /// Sender display name.
    pub from_name: String,
    /// Recipient address, bare or `"Name <addr>"`.
    pub to: String,
    /// Recipient display name.
    pub to_name: String,
    /// Subject line.
    pub subject: String,
    /// HTML body variant.
    pub html_body: String,
    /// Plain text body variant.
    pub text_body: String,
    /// Combined body, treated as HTML. Takes precedence over both variants.
    pub body: String,
    /// `Reply-To` address; the sender is used when empty.
    pub reply_to: String,
    /// Attachments, in output order.
    pub attachments: Vec<Attachment>,
    /// Adds `X-Transactional` and `Precedence` headers.
    pub is_transactional: bool,
}

impl Message {
    /// Returns true if at least one attachment still has to be downloaded.
    #[must_use]
    pub fn needs_hydration(&self) -> bool {
        self.attachments.iter().any(|a| a.body.is_empty())
    }

    /// Returns `reply_to`, or `from` when it is blank.
    #[must_use]
    pub fn reply_to_or_from(&self) -> &str {
        if self.reply_to.trim().is_empty() {
            &self.from
        } else {
            &self.reply_to
        }
    }
}

/// A file attached to a [`Message`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attachment {
    /// Where to download the content from when `body` is empty.
    #[serde(rename = "url")]
    pub source_url: String,
    /// Raw content. Travels as standard base64 in JSON.
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,
    /// MIME type, inferred from the download when empty.
    pub content_type: String,
    /// Filename, inferred from the download when empty.
    pub filename: String,
}

impl Attachment {
    /// Creates an attachment that will be downloaded from `url`.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            source_url: url.into(),
            ..Self::default()
        }
    }

    /// Creates an attachment with inline content.
    #[must_use]
    pub fn inline(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            source_url: String::new(),
            body: body.into(),
            content_type: content_type.into(),
            filename: filename.into(),
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        let compact: String = encoded.split_whitespace().collect();
        STANDARD.decode(compact).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_request_shape() {
        let json = r#"{
            "from": "noreply@acme.test",
            "fromName": "Acme",
            "to": "user@example.com",
            "subject": "Receipt",
            "htmlBody": "<p>Thanks</p>",
            "replyTo": "help@acme.test",
            "isTransactional": true,
            "attachments": [
                {"url": "https://files.acme.test/r.pdf"},
                {"body": "aGVsbG8=", "contentType": "text/plain", "filename": "hi.txt"}
            ]
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.from_name, "Acme");
        assert_eq!(msg.to_name, "");
        assert!(msg.is_transactional);
        assert_eq!(msg.attachments.len(), 2);
        assert_eq!(msg.attachments[0].source_url, "https://files.acme.test/r.pdf");
        assert!(msg.attachments[0].body.is_empty());
        assert_eq!(msg.attachments[1].body, b"hello");
        assert!(msg.needs_hydration());
    }

    #[test]
    fn null_body_is_empty() {
        let att: Attachment = serde_json::from_str(r#"{"url":"x","body":null}"#).unwrap();
        assert!(att.body.is_empty());
    }

    #[test]
    fn invalid_base64_body_is_rejected() {
        assert!(serde_json::from_str::<Attachment>(r#"{"body":"not base64!"}"#).is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let msg = Message {
            from: "a@b.com".into(),
            attachments: vec![Attachment::inline("a.txt", "text/plain", b"hi".to_vec())],
            ..Message::default()
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["isTransactional"], false);
        assert_eq!(value["attachments"][0]["body"], "aGk=");
        assert_eq!(value["attachments"][0]["url"], "");
    }

    #[test]
    fn reply_to_defaults_to_sender() {
        let mut msg = Message {
            from: "a@b.com".into(),
            ..Message::default()
        };
        assert_eq!(msg.reply_to_or_from(), "a@b.com");
        msg.reply_to = "r@b.com".into();
        assert_eq!(msg.reply_to_or_from(), "r@b.com");
    }
}
