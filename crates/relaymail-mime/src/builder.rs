//! Raw message generation.
//!
//! [`MessageBuilder`] serializes a resolved message into an RFC 5322 message
//! with a `multipart/mixed` body:
//!
//! ```text
//! multipart/mixed
//! ├── multipart/alternative      (only when a text or HTML body is present)
//! │   ├── text/plain; charset=UTF-8
//! │   └── text/html; charset=UTF-8
//! ├── attachment 1 (base64)
//! └── attachment N (base64)
//! ```

use crate::address::Mailbox;
use crate::content_type::{ContentType, OCTET_STREAM};
use crate::encoding::{encode_base64_wrapped, encode_quoted_printable, encode_rfc2047};
use crate::error::Result;
use crate::header::Headers;
use chrono::{DateTime, FixedOffset, Local};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;
use std::io::Write;

/// `Date` header format (RFC 1123 with a numeric zone).
pub const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Prefix of generated boundaries. `=_` cannot occur at the start of a
/// Base64 or Quoted-Printable line, so part content never collides with it.
const BOUNDARY_PREFIX: &str = "=_rm_";

/// Number of random characters in a boundary.
const BOUNDARY_TOKEN_LEN: usize = 32;

/// Fallback filename for attachments without one.
const DEFAULT_FILENAME: &str = "attachment";

/// Generates a fresh multipart boundary token.
#[must_use]
pub fn generate_boundary() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("{BOUNDARY_PREFIX}{token}")
}

/// Content transfer encodings written by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    /// Filename written to `Content-Disposition`; `attachment` when empty.
    pub filename: String,
    /// MIME type; `application/octet-stream` when empty.
    pub content_type: String,
    /// Raw content. Attachments with an empty body are not written.
    pub body: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    fn headers(&self) -> Headers {
        let content_type = if self.content_type.trim().is_empty() {
            OCTET_STREAM
        } else {
            self.content_type.trim()
        };
        let filename = if self.filename.is_empty() {
            DEFAULT_FILENAME
        } else {
            self.filename.as_str()
        };
        let filename = filename.replace('\\', "\\\\").replace('"', "\\\"");

        let mut headers = Headers::new();
        headers.add("Content-Type", content_type);
        headers.add(
            "Content-Transfer-Encoding",
            TransferEncoding::Base64.to_string(),
        );
        headers.add(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        );
        headers
    }
}

/// Builder for raw outgoing messages.
///
/// Building performs no validation; callers check addresses beforehand.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Mailbox,
    to: Mailbox,
    reply_to: Option<String>,
    subject: String,
    text_body: Option<String>,
    html_body: Option<String>,
    transactional: bool,
    attachments: Vec<Attachment>,
    date: Option<DateTime<FixedOffset>>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, from: Mailbox) -> Self {
        self.from = from;
        self
    }

    /// Sets the recipient.
    #[must_use]
    pub fn to(mut self, to: Mailbox) -> Self {
        self.to = to;
        self
    }

    /// Sets the `Reply-To` value. Empty values fall back to the sender address.
    #[must_use]
    pub fn reply_to(mut self, reply_to: impl Into<String>) -> Self {
        let reply_to = reply_to.into();
        self.reply_to = (!reply_to.trim().is_empty()).then_some(reply_to);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain text body. Empty bodies are omitted.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.text_body = (!body.is_empty()).then_some(body);
        self
    }

    /// Sets the HTML body. Empty bodies are omitted.
    #[must_use]
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.html_body = (!body.is_empty()).then_some(body);
        self
    }

    /// Marks the message as transactional (`X-Transactional`, `Precedence`).
    #[must_use]
    pub const fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    /// Appends an attachment. Order is preserved in the output.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Pins the `Date` header instead of using the current time.
    #[must_use]
    pub const fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Builds the raw message bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.estimated_len());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Writes the raw message to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let boundary = generate_boundary();
        write!(writer, "{}\r\n", self.top_headers(&boundary))?;

        let mut mixed = MultipartWriter::new(writer, boundary);

        if self.text_body.is_some() || self.html_body.is_some() {
            let alt_boundary = generate_boundary();
            let mut part_headers = Headers::new();
            part_headers.add(
                "Content-Type",
                ContentType::multipart_alternative(&alt_boundary).to_string(),
            );
            mixed.start_part(&part_headers)?;

            let mut alternative = MultipartWriter::new(mixed.writer(), alt_boundary);
            if let Some(text) = &self.text_body {
                alternative.start_part(&text_headers(ContentType::text_plain()))?;
                alternative
                    .writer()
                    .write_all(encode_quoted_printable(text).as_bytes())?;
            }
            if let Some(html) = &self.html_body {
                alternative.start_part(&text_headers(ContentType::text_html()))?;
                alternative
                    .writer()
                    .write_all(encode_quoted_printable(html).as_bytes())?;
            }
            alternative.finish()?;
        }

        for attachment in self.attachments.iter().filter(|a| !a.body.is_empty()) {
            mixed.start_part(&attachment.headers())?;
            mixed
                .writer()
                .write_all(encode_base64_wrapped(&attachment.body).as_bytes())?;
        }

        mixed.finish()?;
        Ok(())
    }

    fn top_headers(&self, boundary: &str) -> Headers {
        let date = self.date.unwrap_or_else(|| Local::now().fixed_offset());
        let reply_to = self
            .reply_to
            .as_deref()
            .unwrap_or(self.from.address.as_str());

        let mut headers = Headers::new();
        headers.add("From", self.from.to_string());
        headers.add("To", self.to.to_string());
        headers.add("Reply-To", reply_to);
        headers.add("Subject", encode_rfc2047(&self.subject));
        headers.add("Date", date.format(DATE_FORMAT).to_string());
        headers.add("MIME-Version", "1.0");
        if self.transactional {
            headers.add("X-Transactional", "true");
            headers.add("Precedence", "bulk");
        }
        headers.add(
            "Content-Type",
            ContentType::multipart_mixed(boundary).to_string(),
        );
        headers
    }

    fn estimated_len(&self) -> usize {
        let bodies = self.text_body.as_ref().map_or(0, String::len)
            + self.html_body.as_ref().map_or(0, String::len);
        let attachments: usize = self.attachments.iter().map(|a| a.body.len() * 4 / 3).sum();
        1024 + bodies * 2 + attachments + attachments / 38
    }
}

fn text_headers(content_type: ContentType) -> Headers {
    let mut headers = Headers::new();
    headers.add("Content-Type", content_type.to_string());
    headers.add(
        "Content-Transfer-Encoding",
        TransferEncoding::QuotedPrintable.to_string(),
    );
    headers
}

/// Writes the delimiters of one multipart body.
struct MultipartWriter<'a, W: Write> {
    writer: &'a mut W,
    boundary: String,
    has_parts: bool,
}

impl<'a, W: Write> MultipartWriter<'a, W> {
    const fn new(writer: &'a mut W, boundary: String) -> Self {
        Self {
            writer,
            boundary,
            has_parts: false,
        }
    }

    fn writer(&mut self) -> &mut W {
        self.writer
    }

    /// Writes the delimiter and headers of the next part.
    fn start_part(&mut self, headers: &Headers) -> std::io::Result<()> {
        let boundary = &self.boundary;
        if self.has_parts {
            write!(self.writer, "\r\n--{boundary}\r\n")?;
        } else {
            write!(self.writer, "--{boundary}\r\n")?;
        }
        self.has_parts = true;
        write!(self.writer, "{headers}\r\n")
    }

    /// Writes the closing delimiter.
    fn finish(self) -> std::io::Result<()> {
        let boundary = &self.boundary;
        if self.has_parts {
            write!(self.writer, "\r\n--{boundary}--\r\n")
        } else {
            write!(self.writer, "--{boundary}--\r\n")
        }
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
    use crate::encoding::test_support::{decode_base64, decode_quoted_printable};
    use chrono::TimeZone;

    fn fixed_date() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 4, 9, 5, 7)
            .unwrap()
    }

    fn base_builder() -> MessageBuilder {
        MessageBuilder::new()
            .from(Mailbox::with_name("Acme", "noreply@acme.test"))
            .to(Mailbox::new("user@example.com"))
            .subject("S")
            .date(fixed_date())
    }

    fn build_string(builder: &MessageBuilder) -> String {
        String::from_utf8(builder.build().unwrap()).unwrap()
    }

    fn header_block(raw: &str) -> &str {
        raw.split_once("\r\n\r\n").unwrap().0
    }

    /// Returns the boundary declared in the first `boundary="..."` after `from`.
    fn boundary_after<'a>(raw: &'a str, marker: &str) -> &'a str {
        let start = raw.find(marker).unwrap();
        let rest = &raw[start..];
        let open = rest.find("boundary=\"").unwrap() + "boundary=\"".len();
        let close = rest[open..].find('"').unwrap();
        &rest[open..open + close]
    }

    /// Replaces boundaries and the date so two builds can be compared.
    fn normalize(raw: &str) -> String {
        let outer = boundary_after(raw, "multipart/mixed").to_string();
        let mut normalized = raw.replace(&outer, "OUTER");
        if normalized.contains("multipart/alternative") {
            let inner = boundary_after(&normalized, "multipart/alternative").to_string();
            normalized = normalized.replace(&inner, "INNER");
        }
        normalized
            .lines()
            .filter(|line| !line.starts_with("Date: "))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_header_order() {
        let raw = build_string(&base_builder().transactional(true).text_body("hi"));
        let names: Vec<&str> = header_block(&raw)
            .split("\r\n")
            .map(|line| line.split_once(':').unwrap().0)
            .collect();
        assert_eq!(
            names,
            vec![
                "From",
                "To",
                "Reply-To",
                "Subject",
                "Date",
                "MIME-Version",
                "X-Transactional",
                "Precedence",
                "Content-Type"
            ]
        );
    }

    #[test]
    fn test_header_values() {
        let raw = build_string(&base_builder().text_body("hi"));
        let headers = header_block(&raw);
        assert!(headers.starts_with("From: Acme <noreply@acme.test>\r\nTo: user@example.com\r\n"));
        assert!(headers.contains("Reply-To: noreply@acme.test\r\n"));
        assert!(headers.contains("Subject: S\r\n"));
        assert!(headers.contains("Date: Tue, 04 Mar 2025 09:05:07 -0500\r\n"));
        assert!(headers.contains("MIME-Version: 1.0\r\n"));
        assert!(!headers.contains("X-Transactional"));
        assert!(!headers.contains("Precedence"));
    }

    #[test]
    fn test_explicit_reply_to() {
        let raw = build_string(&base_builder().reply_to("help@acme.test"));
        assert!(raw.contains("Reply-To: help@acme.test\r\n"));
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let raw = build_string(&base_builder().subject("Café"));
        assert!(raw.contains("Subject: =?utf-8?B?Q2Fmw6k=?=\r\n"));
    }

    #[test]
    fn test_alternative_part_layout() {
        let raw = build_string(&base_builder().text_body("Hello").html_body("<p>Hello</p>"));
        let outer = boundary_after(&raw, "multipart/mixed");
        let inner = boundary_after(&raw, "multipart/alternative");
        assert_ne!(outer, inner);

        let body = raw.split_once("\r\n\r\n").unwrap().1;
        let expected = format!(
            "--{outer}\r\n\
             Content-Type: multipart/alternative; boundary=\"{inner}\"\r\n\
             \r\n\
             --{inner}\r\n\
             Content-Type: text/plain; charset=UTF-8\r\n\
             Content-Transfer-Encoding: quoted-printable\r\n\
             \r\n\
             Hello\r\n\
             --{inner}\r\n\
             Content-Type: text/html; charset=UTF-8\r\n\
             Content-Transfer-Encoding: quoted-printable\r\n\
             \r\n\
             <p>Hello</p>\r\n\
             --{inner}--\r\n\
             \r\n\
             --{outer}--\r\n"
        );
        assert_eq!(body, expected);
    }

    #[test]
    fn test_only_html_body_omits_text_part() {
        let raw = build_string(&base_builder().html_body("<b>x</b>"));
        assert!(raw.contains("text/html"));
        assert!(!raw.contains("text/plain"));
    }

    #[test]
    fn test_no_body_omits_alternative_part() {
        let raw = build_string(&base_builder());
        let outer = boundary_after(&raw, "multipart/mixed");
        assert!(!raw.contains("multipart/alternative"));
        assert!(raw.ends_with(&format!("\r\n\r\n--{outer}--\r\n")));
    }

    #[test]
    fn test_body_is_quoted_printable_encoded() {
        let text = format!("Prix: 5€ = cinq\n{}", "y".repeat(120));
        let raw = build_string(&base_builder().text_body(text.clone()));
        let inner = boundary_after(&raw, "multipart/alternative");
        let part_start = raw.find("quoted-printable\r\n\r\n").unwrap() + "quoted-printable\r\n\r\n".len();
        let part_end = raw[part_start..].find(&format!("\r\n--{inner}")).unwrap();
        let payload = &raw[part_start..part_start + part_end];

        assert!(payload.lines().all(|line| line.len() <= 76));
        assert_eq!(
            decode_quoted_printable(payload).unwrap(),
            text.replace('\n', "\r\n")
        );
    }

    #[test]
    fn test_attachment_part() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let raw = build_string(
            &base_builder()
                .text_body("see attached")
                .attach(Attachment::new("report.bin", "application/x-report", data.clone())),
        );
        let outer = boundary_after(&raw, "multipart/mixed");

        let marker = "Content-Disposition: attachment; filename=\"report.bin\"\r\n\r\n";
        let start = raw.find(marker).unwrap() + marker.len();
        let end = raw[start..].find(&format!("\r\n--{outer}--")).unwrap();
        let payload = &raw[start..start + end];

        let lines: Vec<&str> = payload.split_terminator("\r\n").collect();
        let (last, full) = lines.split_last().unwrap();
        assert!(full.iter().all(|line| line.len() == 76));
        assert!(last.len() <= 76);
        assert_eq!(decode_base64(&lines.concat()).unwrap(), data);

        assert!(raw.contains("Content-Type: application/x-report\r\nContent-Transfer-Encoding: base64\r\n"));
    }

    #[test]
    fn test_attachment_fallbacks() {
        let raw = build_string(&base_builder().attach(Attachment::new("", "", b"abc".to_vec())));
        assert!(raw.contains(
            "Content-Type: application/octet-stream\r\n\
             Content-Transfer-Encoding: base64\r\n\
             Content-Disposition: attachment; filename=\"attachment\"\r\n"
        ));
    }

    #[test]
    fn test_attachment_filename_is_escaped() {
        let raw = build_string(&base_builder().attach(Attachment::new(
            "a\"b.txt",
            "text/plain",
            b"abc".to_vec(),
        )));
        assert!(raw.contains("filename=\"a\\\"b.txt\""));
    }

    #[test]
    fn test_empty_attachment_is_skipped() {
        let raw = build_string(
            &base_builder()
                .attach(Attachment::new("empty.txt", "text/plain", Vec::new()))
                .attach(Attachment::new("full.txt", "text/plain", b"x".to_vec())),
        );
        assert!(!raw.contains("empty.txt"));
        assert!(raw.contains("full.txt"));
    }

    #[test]
    fn test_attachment_order_is_preserved() {
        let raw = build_string(
            &base_builder()
                .attach(Attachment::new("first.txt", "text/plain", b"1".to_vec()))
                .attach(Attachment::new("second.txt", "text/plain", b"2".to_vec()))
                .attach(Attachment::new("third.txt", "text/plain", b"3".to_vec())),
        );
        let first = raw.find("first.txt").unwrap();
        let second = raw.find("second.txt").unwrap();
        let third = raw.find("third.txt").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_build_twice_is_structurally_identical() {
        let builder = MessageBuilder::new()
            .from(Mailbox::new("a@b.com"))
            .to(Mailbox::new("c@d.com"))
            .subject("S")
            .text_body("hi")
            .html_body("<p>hi</p>")
            .attach(Attachment::new("x.txt", "text/plain", b"payload".to_vec()));

        let first = build_string(&builder);
        let second = build_string(&builder);
        assert_ne!(
            boundary_after(&first, "multipart/mixed"),
            boundary_after(&second, "multipart/mixed")
        );
        assert_eq!(normalize(&first), normalize(&second));
    }

    #[test]
    fn test_write_failure_is_reported() {
        struct FailingWriter;

        impl Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let err = base_builder().write_to(&mut FailingWriter).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn test_generated_boundaries_are_unique() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert_ne!(a, b);
        assert!(a.starts_with(BOUNDARY_PREFIX));
        assert_eq!(a.len(), BOUNDARY_PREFIX.len() + BOUNDARY_TOKEN_LEN);
    }
}
