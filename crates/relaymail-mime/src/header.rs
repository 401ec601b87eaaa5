//! MIME header handling.

use std::fmt;

/// Ordered collection of email headers.
///
/// Headers are serialized in insertion order, one `Name: value` line per
/// entry terminated by CRLF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    ///
    /// Carriage returns and line feeds in the value are replaced by spaces so a
    /// value can never start a new header line.
    pub fn add(&mut self, name: impl Into<String>, value: impl AsRef<str>) {
        self.entries
            .push((name.into(), sanitize_value(value.as_ref())));
    }
}

fn sanitize_value(value: &str) -> String {
    if value.contains(['\r', '\n']) {
        value.replace("\r\n", " ").replace(['\r', '\n'], " ")
    } else {
        value.to_string()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
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
    fn test_headers_new() {
        assert_eq!(Headers::new().to_string(), "");
    }

    #[test]
    fn test_headers_display_keeps_insertion_order() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");
        headers.add("Reply-To", "sender@example.com");

        assert_eq!(
            headers.to_string(),
            "From: sender@example.com\r\nTo: recipient@example.com\r\nReply-To: sender@example.com\r\n"
        );
    }

    #[test]
    fn test_headers_keep_duplicates() {
        let mut headers = Headers::new();
        headers.add("Received", "a");
        headers.add("Received", "b");
        assert_eq!(headers.to_string(), "Received: a\r\nReceived: b\r\n");
    }

    #[test]
    fn test_headers_strip_line_breaks() {
        let mut headers = Headers::new();
        headers.add("Subject", "Hello\r\nBcc: victim@example.com");
        headers.add("X-Note", "one\ntwo\rthree");
        assert_eq!(
            headers.to_string(),
            "Subject: Hello Bcc: victim@example.com\r\nX-Note: one two three\r\n"
        );
    }
}
