//! Development transport: renders messages instead of delivering them.

use crate::error::{Result, TransportError};
use crate::model::Message;
use relaymail_mime::extract_address;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::info;

const DELIMITER: &str = "==========";

/// Where console renderings go.
#[derive(Debug, Clone, Default)]
pub enum ConsoleSink {
    /// Process standard output.
    #[default]
    Stdout,
    /// Shared in-memory buffer, mostly for tests.
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl ConsoleSink {
    /// Creates a buffer sink and returns it with a handle to its contents.
    #[must_use]
    pub fn buffer() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (Self::Buffer(Arc::clone(&buf)), buf)
    }

    fn write(&self, text: &str) -> io::Result<()> {
        match self {
            Self::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(text.as_bytes())?;
                out.flush()
            }
            Self::Buffer(buf) => {
                let mut buf = buf
                    .lock()
                    .map_err(|_| io::Error::other("console buffer lock poisoned"))?;
                buf.extend_from_slice(text.as_bytes());
                Ok(())
            }
        }
    }
}

/// Transport that never touches the network.
#[derive(Debug, Clone, Default)]
pub struct ConsoleTransport {
    sink: ConsoleSink,
}

impl ConsoleTransport {
    /// Creates a console transport writing to `sink`.
    #[must_use]
    pub const fn new(sink: ConsoleSink) -> Self {
        Self { sink }
    }

    /// Writes a readable rendering of `message` to the sink.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Console`] if the sink cannot be written.
    pub fn send(&self, message: &Message) -> Result<()> {
        self.sink
            .write(&render(message))
            .map_err(TransportError::Console)?;
        info!(
            to = %message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "email rendered to console"
        );
        Ok(())
    }
}

/// Renders headers, both body variants and an attachment summary.
#[must_use]
pub fn render(message: &Message) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{DELIMITER}");
    let _ = writeln!(out, "From: {}", display(&message.from_name, &message.from));
    let _ = writeln!(out, "To: {}", display(&message.to_name, &message.to));
    let _ = writeln!(out, "Reply-To: {}", message.reply_to_or_from());
    let _ = writeln!(out, "Subject: {}", message.subject);
    out.push('\n');

    for body in [&message.text_body, &message.html_body] {
        if !body.is_empty() {
            let _ = writeln!(out, "{body}");
        }
    }

    let attachments: Vec<_> = message
        .attachments
        .iter()
        .filter(|a| !a.body.is_empty())
        .collect();
    if !attachments.is_empty() {
        out.push_str("Attachments:\n");
        for att in attachments {
            let _ = writeln!(
                out,
                "  - {} ({}, {} bytes)",
                non_empty(&att.filename, "attachment"),
                non_empty(&att.content_type, relaymail_mime::OCTET_STREAM),
                att.body.len()
            );
        }
    }

    let _ = writeln!(out, "{DELIMITER}");
    out
}

fn display(name: &str, address: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        address.trim().to_string()
    } else {
        format!("{name} <{}>", extract_address(address))
    }
}

fn non_empty<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
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
    use crate::model::Attachment;

    #[test]
    fn renders_full_message() {
        let msg = Message {
            from: "noreply@acme.test".into(),
            from_name: "Acme".into(),
            to: "c@d.com".into(),
            subject: "S".into(),
            text_body: "hi".into(),
            html_body: "<p>hi</p>".into(),
            attachments: vec![
                Attachment::inline("r.pdf", "application/pdf", b"%PDF-1".to_vec()),
                Attachment::inline("", "", b"x".to_vec()),
            ],
            ..Message::default()
        };

        assert_eq!(
            render(&msg),
            "==========\n\
             From: Acme <noreply@acme.test>\n\
             To: c@d.com\n\
             Reply-To: noreply@acme.test\n\
             Subject: S\n\
             \n\
             hi\n\
             <p>hi</p>\n\
             Attachments:\n\
             \x20 - r.pdf (application/pdf, 6 bytes)\n\
             \x20 - attachment (application/octet-stream, 1 bytes)\n\
             ==========\n"
        );
    }

    #[test]
    fn send_writes_to_buffer() {
        let (sink, buf) = ConsoleSink::buffer();
        let msg = Message {
            to: "c@d.com".into(),
            subject: "Hello".into(),
            ..Message::default()
        };
        ConsoleTransport::new(sink).send(&msg).unwrap();
        let out = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert!(out.contains("Subject: Hello\n"));
        assert!(!out.contains("Attachments:"));
    }

    #[test]
    fn display_name_wraps_bare_address() {
        assert_eq!(display("Jane", "Old <j@x.com>"), "Jane <j@x.com>");
        assert_eq!(display("", " j@x.com "), "j@x.com");
    }
}
