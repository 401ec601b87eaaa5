//! Mapping from the message model to a raw MIME message.

use crate::model::Message;
use relaymail_mime::{Attachment, Mailbox, MessageBuilder};

/// Prepares a [`MessageBuilder`] for `message`.
///
/// Display names wrap the extracted bare address, attachments keep their
/// order and `Reply-To` falls back to the sender.
#[must_use]
pub fn message_builder(message: &Message) -> MessageBuilder {
    let builder = MessageBuilder::new()
        .from(Mailbox::with_name(&message.from_name, &message.from))
        .to(Mailbox::with_name(&message.to_name, &message.to))
        .reply_to(message.reply_to_or_from())
        .subject(message.subject.as_str())
        .text_body(message.text_body.as_str())
        .html_body(message.html_body.as_str())
        .transactional(message.is_transactional);

    message.attachments.iter().fold(builder, |builder, att| {
        builder.attach(Attachment::new(
            att.filename.as_str(),
            att.content_type.as_str(),
            att.body.as_slice(),
        ))
    })
}

/// Serializes `message` to raw MIME bytes.
///
/// # Errors
///
/// Returns an error if the message cannot be written.
pub fn build_raw_message(message: &Message) -> relaymail_mime::Result<Vec<u8>> {
    message_builder(message).build()
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
    use crate::model::Attachment as ModelAttachment;
    use chrono::DateTime;

    fn sample() -> Message {
        Message {
            from: "noreply@acme.test".into(),
            from_name: "Acme".into(),
            to: "Jane <jane@example.com>".into(),
            subject: "Receipt".into(),
            text_body: "Thanks".into(),
            html_body: "<p>Thanks</p>".into(),
            attachments: vec![
                ModelAttachment::inline("r.pdf", "application/pdf", b"%PDF".to_vec()),
                ModelAttachment::from_url("https://files.test/empty"),
            ],
            ..Message::default()
        }
    }

    #[test]
    fn headers_follow_model() {
        let date = DateTime::parse_from_rfc2822("Tue, 01 Jul 2025 10:00:00 +0000").unwrap();
        let raw = String::from_utf8(message_builder(&sample()).date(date).build().unwrap()).unwrap();

        assert!(raw.starts_with(
            "From: Acme <noreply@acme.test>\r\n\
             To: jane@example.com\r\n\
             Reply-To: noreply@acme.test\r\n\
             Subject: Receipt\r\n\
             Date: Tue, 01 Jul 2025 10:00:00 +0000\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\""
        ));
        assert!(!raw.contains("X-Transactional"));
    }

    #[test]
    fn empty_attachments_are_skipped() {
        let raw = String::from_utf8(build_raw_message(&sample()).unwrap()).unwrap();
        assert_eq!(raw.matches("Content-Disposition: attachment").count(), 1);
        assert!(raw.contains("filename=\"r.pdf\""));
    }

    #[test]
    fn to_name_wraps_extracted_address() {
        let msg = Message {
            to_name: "Jane Doe".into(),
            is_transactional: true,
            reply_to: "help@acme.test".into(),
            ..sample()
        };
        let raw = String::from_utf8(build_raw_message(&msg).unwrap()).unwrap();
        assert!(raw.contains("To: Jane Doe <jane@example.com>\r\n"));
        assert!(raw.contains("Reply-To: help@acme.test\r\n"));
        assert!(raw.contains("X-Transactional: true\r\nPrecedence: bulk\r\n"));
    }
}
