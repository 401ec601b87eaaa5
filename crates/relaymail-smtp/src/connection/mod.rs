//! SMTP connection management with type-state pattern.

mod client;
mod stream;

pub use client::{Client, Connected, Data, MailTransaction, RecipientAdded, SmtpConnection};
pub use stream::{SmtpStream, connect};

use crate::types::Extension;
use std::collections::HashSet;

/// Relay capabilities from the greeting and EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Relay hostname from the greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the relay supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if 8BITMIME is supported.
    #[must_use]
    pub fn supports_8bitmime(&self) -> bool {
        self.supports(&Extension::EightBitMime)
    }

    /// Returns the maximum message size, if advertised and non-zero.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(Some(size)) if *size > 0 => Some(*size),
            _ => None,
        })
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
    fn size_zero_means_no_limit() {
        let info = ServerInfo {
            hostname: "relay".into(),
            extensions: [Extension::Size(Some(0)), Extension::EightBitMime].into(),
        };
        assert_eq!(info.max_message_size(), None);
        assert!(info.supports_8bitmime());
    }

    #[test]
    fn size_limit_reported() {
        let info = ServerInfo {
            hostname: "relay".into(),
            extensions: [Extension::Size(Some(1024))].into(),
        };
        assert_eq!(info.max_message_size(), Some(1024));
        assert!(!info.supports_8bitmime());
    }
}
