//! SMTP command serialization and message data encoding.

use crate::types::Address;

/// SMTP command sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// HELO - Basic greeting for relays without ESMTP
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
        /// BODY parameter (7BIT, 8BITMIME)
        body: Option<String>,
        /// SIZE parameter
        size: Option<usize>,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command to a CRLF-terminated line.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let line = match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::Helo { hostname } => format!("HELO {hostname}"),
            Self::MailFrom { from, body, size } => {
                let mut line = format!("MAIL FROM:<{from}>");
                if let Some(body) = body {
                    line.push_str(" BODY=");
                    line.push_str(body);
                }
                if let Some(size) = size {
                    line.push_str(&format!(" SIZE={size}"));
                }
                line
            }
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Quit => "QUIT".to_string(),
        };

        let mut buf = line.into_bytes();
        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Encodes a message for the DATA phase.
///
/// Line endings are normalized to CRLF, lines starting with `.` are
/// dot-stuffed and the `.` terminator line is appended. A single trailing
/// line break on the input does not produce an extra empty line.
#[must_use]
pub fn encode_message_data(message: &[u8]) -> Vec<u8> {
    let body = message
        .strip_suffix(b"\r\n")
        .or_else(|| message.strip_suffix(b"\n"))
        .unwrap_or(message);

    let mut out = Vec::with_capacity(body.len() + body.len() / 64 + 8);
    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }
    out.extend_from_slice(b".\r\n");
    out
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
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "localhost".to_string(),
        };
        assert_eq!(cmd.serialize(), b"EHLO localhost\r\n");
    }

    #[test]
    fn test_helo_command() {
        let cmd = Command::Helo {
            hostname: "relay.test".to_string(),
        };
        assert_eq!(cmd.serialize(), b"HELO relay.test\r\n");
    }

    #[test]
    fn test_mail_from_simple() {
        let cmd = Command::MailFrom {
            from: Address::new("sender@example.com").unwrap(),
            body: None,
            size: None,
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<sender@example.com>\r\n");
    }

    #[test]
    fn test_mail_from_with_params() {
        let cmd = Command::MailFrom {
            from: Address::new("sender@example.com").unwrap(),
            body: Some("8BITMIME".to_string()),
            size: Some(12345),
        };
        assert_eq!(
            cmd.serialize(),
            b"MAIL FROM:<sender@example.com> BODY=8BITMIME SIZE=12345\r\n"
        );
    }

    #[test]
    fn test_rcpt_data_quit() {
        let rcpt = Command::RcptTo {
            to: Address::new("recipient@example.com").unwrap(),
        };
        assert_eq!(rcpt.serialize(), b"RCPT TO:<recipient@example.com>\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_encode_normalizes_line_endings() {
        assert_eq!(
            encode_message_data(b"Subject: a\nX: b\r\n\r\nbody"),
            b"Subject: a\r\nX: b\r\n\r\nbody\r\n.\r\n"
        );
    }

    #[test]
    fn test_encode_does_not_double_trailing_crlf() {
        assert_eq!(encode_message_data(b"body\r\n"), b"body\r\n.\r\n");
        assert_eq!(encode_message_data(b"body\r\n\r\n"), b"body\r\n\r\n.\r\n");
    }

    #[test]
    fn test_encode_dot_stuffing() {
        assert_eq!(
            encode_message_data(b"a\r\n.\r\n..b\r\n"),
            b"a\r\n..\r\n...b\r\n.\r\n"
        );
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode_message_data(b""), b".\r\n");
    }
}
