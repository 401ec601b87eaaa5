//! Local relay transport: SMTP submission without authentication.

use super::{require_from, require_to};
use crate::config::RelayConfig;
use crate::error::{Result, TransportError};
use crate::model::Message;
use crate::raw::build_raw_message;
use relaymail_mime::extract_address;
use relaymail_smtp::connection::connect;
use relaymail_smtp::{Address, Client};
use tracing::{debug, info, warn};

/// Submits messages to a local SMTP relay such as Mailpit.
#[derive(Debug, Clone, Default)]
pub struct RelayTransport {
    config: RelayConfig,
}

impl RelayTransport {
    /// Creates a relay transport.
    #[must_use]
    pub const fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Builds `message` and hands it to the relay.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing or malformed `to`/`from`
    /// (before any connection is made) and [`TransportError`] when building
    /// or submission fails.
    pub async fn send(&self, message: &Message) -> Result<()> {
        require_to(message)?;
        require_from(message)?;

        let raw = build_raw_message(message).map_err(TransportError::Build)?;
        let from = Address::new(extract_address(&message.from)).map_err(TransportError::Smtp)?;
        let to = Address::new(extract_address(&message.to)).map_err(TransportError::Smtp)?;

        let dialogue = self.submit(from, to, &raw);
        let submitted = match self.config.timeout_secs {
            Some(secs) => tokio::time::timeout(std::time::Duration::from_secs(secs), dialogue)
                .await
                .map_err(|_| TransportError::Timeout(secs))?,
            None => dialogue.await,
        };
        if let Err(TransportError::Smtp(err)) = &submitted {
            warn!(
                host = %self.config.host,
                permanent = err.is_permanent(),
                error = %err,
                "relay refused message"
            );
        }
        submitted?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            to = %message.to,
            bytes = raw.len(),
            "email submitted to relay"
        );
        Ok(())
    }

    async fn submit(
        &self,
        from: Address,
        to: Address,
        raw: &[u8],
    ) -> std::result::Result<(), TransportError> {
        let RelayConfig {
            host,
            port,
            hello_name,
            ..
        } = &self.config;
        debug!(host = %host, port, "connecting to relay");

        let stream = connect(host, *port).await?;
        let client = Client::from_stream(stream)
            .await?
            .ehlo(hello_name)
            .await?
            .mail_from(from, Some(raw.len()))
            .await?
            .rcpt_to(to)
            .await?
            .data()
            .await?
            .send_message(raw)
            .await?;
        client.quit().await?;
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
    use crate::error::{Error, ValidationError};

    /// A relay address nothing listens on.
    async fn unreachable_relay() -> RelayTransport {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        RelayTransport::new(RelayConfig {
            host: "127.0.0.1".into(),
            port,
            ..RelayConfig::default()
        })
    }

    #[tokio::test]
    async fn rejects_missing_recipient_before_connecting() {
        let msg = Message {
            from: "a@b.com".into(),
            ..Message::default()
        };
        let err = unreachable_relay().await.send(&msg).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::InvalidTo)));
    }

    #[tokio::test]
    async fn rejects_sender_without_at() {
        let msg = Message {
            from: "nobody".into(),
            to: "c@d.com".into(),
            ..Message::default()
        };
        let err = unreachable_relay().await.send(&msg).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::InvalidFrom)));
    }

    #[tokio::test]
    async fn unreachable_relay_is_transport_error() {
        let msg = Message {
            from: "a@b.com".into(),
            to: "c@d.com".into(),
            subject: "S".into(),
            html_body: "<p>hi</p>".into(),
            ..Message::default()
        };
        let err = unreachable_relay().await.send(&msg).await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Smtp(_))));
        assert!(!err.is_client_error());
    }
}
