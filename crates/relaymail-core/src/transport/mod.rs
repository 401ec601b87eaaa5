//! Delivery backends.
//!
//! [`Transport`] is a closed set of three interchangeable variants, chosen
//! once from [`MailerConfig`] and injected into the
//! [`MailService`](crate::MailService):
//!
//! - [`ConsoleTransport`]: renders the message, no network
//! - [`RelayTransport`]: SMTP submission to a local no-auth relay
//! - [`CloudTransport`]: Amazon SES v2 raw-message API

mod cloud;
mod console;
mod relay;

pub use cloud::CloudTransport;
pub use console::{ConsoleSink, ConsoleTransport, render};
pub use relay::RelayTransport;

use crate::config::{MailerConfig, Provider};
use crate::error::{Result, ValidationError};
use crate::model::Message;

/// A configured delivery backend.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Console rendering.
    Console(ConsoleTransport),
    /// Local SMTP relay.
    Relay(RelayTransport),
    /// Cloud email API.
    Cloud(CloudTransport),
}

impl Transport {
    /// Creates the transport selected by `config.provider`.
    #[must_use]
    pub fn from_config(config: &MailerConfig) -> Self {
        match config.provider {
            Provider::Dev => Self::Console(ConsoleTransport::default()),
            Provider::Smtp => Self::Relay(RelayTransport::new(config.relay.clone())),
            Provider::Ses => Self::Cloud(CloudTransport::new(config.cloud.clone())),
        }
    }

    /// Delivers a resolved message.
    ///
    /// # Errors
    ///
    /// Returns the variant's validation or transport error.
    pub async fn send(&self, message: &Message) -> Result<()> {
        match self {
            Self::Console(console) => console.send(message),
            Self::Relay(relay) => relay.send(message).await,
            Self::Cloud(cloud) => cloud.send(message).await,
        }
    }

    /// Short name of the variant, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Console(_) => "console",
            Self::Relay(_) => "relay",
            Self::Cloud(_) => "cloud",
        }
    }
}

impl From<ConsoleTransport> for Transport {
    fn from(transport: ConsoleTransport) -> Self {
        Self::Console(transport)
    }
}

impl From<RelayTransport> for Transport {
    fn from(transport: RelayTransport) -> Self {
        Self::Relay(transport)
    }
}

impl From<CloudTransport> for Transport {
    fn from(transport: CloudTransport) -> Self {
        Self::Cloud(transport)
    }
}

fn is_address(value: &str) -> bool {
    !value.trim().is_empty() && value.contains('@')
}

pub(crate) fn require_to(message: &Message) -> std::result::Result<(), ValidationError> {
    if is_address(&message.to) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTo)
    }
}

pub(crate) fn require_from(message: &Message) -> std::result::Result<(), ValidationError> {
    if is_address(&message.from) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFrom)
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
    fn provider_selects_variant() {
        let mut config = MailerConfig::default();
        assert_eq!(Transport::from_config(&config).name(), "console");
        config.provider = Provider::Smtp;
        assert_eq!(Transport::from_config(&config).name(), "relay");
        config.provider = Provider::Ses;
        assert_eq!(Transport::from_config(&config).name(), "cloud");
    }

    #[test]
    fn address_checks() {
        let mut msg = Message::default();
        assert_eq!(require_to(&msg), Err(ValidationError::InvalidTo));
        assert_eq!(require_from(&msg), Err(ValidationError::InvalidFrom));
        msg.to = "  ".into();
        assert_eq!(require_to(&msg), Err(ValidationError::InvalidTo));
        msg.to = "c@d.com".into();
        msg.from = "Jane <j@x.com>".into();
        assert_eq!(require_to(&msg), Ok(()));
        assert_eq!(require_from(&msg), Ok(()));
    }

    #[tokio::test]
    async fn console_variant_always_succeeds() {
        let (sink, buf) = ConsoleSink::buffer();
        let transport = Transport::from(ConsoleTransport::new(sink));
        transport.send(&Message::default()).await.unwrap();
        assert!(!buf.lock().unwrap().is_empty());
    }
}
