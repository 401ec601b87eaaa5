//! Mailbox formatting and address extraction.

use crate::encoding::encode_rfc2047;
use std::fmt;

/// Characters that force a display name into a quoted-string (RFC 5322 specials).
const SPECIALS: &str = "()<>[]:;@\\,.\"";

/// Extracts the bare address from a `"Name <addr>"` formatted string.
///
/// When the input contains a `<` before a `>`, the trimmed text between them
/// is returned. Anything else, including malformed input such as
/// `"broken > <"`, comes back trimmed but otherwise unchanged.
#[must_use]
pub fn extract_address(input: &str) -> &str {
    let trimmed = input.trim();
    match (trimmed.find('<'), trimmed.find('>')) {
        (Some(start), Some(end)) if start < end => trimmed[start + 1..end].trim(),
        _ => trimmed,
    }
}

/// Mailbox (optional display name + address) as written in `From`/`To` headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: String,
}

impl Mailbox {
    /// Creates a mailbox from an address.
    ///
    /// The address goes through [`extract_address`], so `"Jane <j@x.com>"`
    /// and `"j@x.com"` both produce the address `j@x.com`.
    #[must_use]
    pub fn new(address: &str) -> Self {
        Self {
            name: None,
            address: extract_address(address).to_string(),
        }
    }

    /// Creates a mailbox with a display name. Blank names are ignored.
    #[must_use]
    pub fn with_name(name: &str, address: &str) -> Self {
        let name = name.trim();
        Self {
            name: (!name.is_empty()).then(|| name.to_string()),
            ..Self::new(address)
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = &self.address;
        match &self.name {
            None => write!(f, "{address}"),
            Some(name) if !name.is_ascii() => {
                write!(f, "{} <{address}>", encode_rfc2047(name))
            }
            Some(name) if name.contains(|c: char| SPECIALS.contains(c)) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{address}>")
            }
            Some(name) => write!(f, "{name} <{address}>"),
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
    use proptest::prelude::*;

    #[test]
    fn test_extract_from_display_form() {
        assert_eq!(extract_address("Jane Doe <j@x.com>"), "j@x.com");
        assert_eq!(extract_address("  Jane <  j@x.com > "), "j@x.com");
    }

    #[test]
    fn test_extract_bare_address() {
        assert_eq!(extract_address("j@x.com"), "j@x.com");
        assert_eq!(extract_address("  j@x.com\t"), "j@x.com");
    }

    #[test]
    fn test_extract_malformed_returns_trimmed_input() {
        assert_eq!(extract_address("broken > <"), "broken > <");
        assert_eq!(extract_address(" only <open "), "only <open");
    }

    proptest! {
        #[test]
        fn extract_without_brackets_is_trim(s in "[^<>]{0,64}") {
            prop_assert_eq!(extract_address(&s), s.trim());
        }
    }

    #[test]
    fn test_mailbox_bare() {
        assert_eq!(Mailbox::new("user@example.com").to_string(), "user@example.com");
    }

    #[test]
    fn test_mailbox_with_name() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com");
        assert_eq!(mailbox.to_string(), "John Doe <john@example.com>");
    }

    #[test]
    fn test_mailbox_blank_name_is_bare() {
        let mailbox = Mailbox::with_name("  ", "john@example.com");
        assert!(mailbox.name.is_none());
        assert_eq!(mailbox.to_string(), "john@example.com");
    }

    #[test]
    fn test_mailbox_extracts_from_formatted_address() {
        let mailbox = Mailbox::with_name("Support", "Old Name <help@example.com>");
        assert_eq!(mailbox.to_string(), "Support <help@example.com>");
    }

    #[test]
    fn test_mailbox_quotes_specials() {
        let mailbox = Mailbox::with_name("Doe, \"JD\" John", "jd@example.com");
        assert_eq!(mailbox.to_string(), "\"Doe, \\\"JD\\\" John\" <jd@example.com>");
    }

    #[test]
    fn test_mailbox_encodes_non_ascii_name() {
        let mailbox = Mailbox::with_name("Zoë", "zoe@example.com");
        assert_eq!(mailbox.to_string(), "=?utf-8?B?Wm/Dqw==?= <zoe@example.com>");
    }
}
