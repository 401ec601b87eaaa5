//! Send orchestration.

use crate::body::resolve_bodies;
use crate::config::MailerConfig;
use crate::error::Result;
use crate::hydrate::Hydrator;
use crate::model::Message;
use crate::quota::QuotaRecorder;
use crate::raw::build_raw_message;
use crate::transport::Transport;
use tracing::{debug, info, warn};

/// Runs a message through hydration, body resolution and delivery.
///
/// Holds only read-only configuration, so one service can serve concurrent
/// sends.
#[derive(Debug, Clone)]
pub struct MailService<Q> {
    transport: Transport,
    hydrator: Hydrator,
    quota: Q,
}

impl<Q: QuotaRecorder> MailService<Q> {
    /// Creates a service from its parts.
    #[must_use]
    pub const fn new(transport: Transport, hydrator: Hydrator, quota: Q) -> Self {
        Self {
            transport,
            hydrator,
            quota,
        }
    }

    /// Creates a service with the transport and fetch settings of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(config: &MailerConfig, quota: Q) -> Result<Self> {
        Ok(Self::new(
            Transport::from_config(config),
            Hydrator::new(config.fetch.timeout())?,
            quota,
        ))
    }

    /// Returns the configured transport.
    #[must_use]
    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Sends `message` on behalf of `tenant_id`.
    ///
    /// Missing attachment content is downloaded, missing body variants are
    /// derived, and the message goes to the transport. On success the
    /// tenant's monthly counter is incremented; a failure there is logged
    /// and does not fail the send.
    ///
    /// # Errors
    ///
    /// Returns the first validation, fetch or transport error unchanged.
    pub async fn send(&self, tenant_id: &str, mut message: Message) -> Result<()> {
        self.prepare(&mut message).await?;
        self.transport.send(&message).await?;
        info!(
            tenant = %tenant_id,
            transport = self.transport.name(),
            to = %message.to,
            "email sent"
        );

        if let Err(err) = self.quota.increment_monthly_sent(tenant_id).await {
            warn!(tenant = %tenant_id, error = %err, "failed to record sent email");
        }
        Ok(())
    }

    /// Prepares `message` like [`send`](Self::send) and returns the raw MIME
    /// bytes instead of delivering them.
    ///
    /// # Errors
    ///
    /// Returns validation and fetch errors, or [`Error::Build`](crate::Error::Build)
    /// if serialization fails.
    pub async fn preview(&self, mut message: Message) -> Result<Vec<u8>> {
        self.prepare(&mut message).await?;
        Ok(build_raw_message(&message)?)
    }

    async fn prepare(&self, message: &mut Message) -> Result<()> {
        if message.needs_hydration() {
            debug!(attachments = message.attachments.len(), "hydrating attachments");
            self.hydrator.hydrate(&mut message.attachments).await?;
        }
        resolve_bodies(message);
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
    use crate::model::Attachment;
    use crate::quota::NoopQuota;
    use crate::transport::{ConsoleSink, ConsoleTransport};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingQuota {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl QuotaRecorder for CountingQuota {
        async fn increment_monthly_sent(&self, tenant_id: &str) -> anyhow::Result<()> {
            assert_eq!(tenant_id, "tenant-1");
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("counter store offline");
            }
            Ok(())
        }
    }

    fn console_service<Q: QuotaRecorder>(quota: Q) -> (MailService<Q>, Arc<std::sync::Mutex<Vec<u8>>>) {
        let (sink, buf) = ConsoleSink::buffer();
        let service = MailService::new(
            ConsoleTransport::new(sink).into(),
            Hydrator::default(),
            quota,
        );
        (service, buf)
    }

    fn message() -> Message {
        Message {
            from: "a@b.com".into(),
            to: "c@d.com".into(),
            subject: "S".into(),
            body: "<h1>Hi</h1>".into(),
            ..Message::default()
        }
    }

    #[tokio::test]
    async fn resolves_bodies_before_delivery() {
        let (service, buf) = console_service(NoopQuota);
        service.send("tenant-1", message()).await.unwrap();
        let out = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert!(out.contains("Subject: S\n\nHi\n<h1>Hi</h1>\n"));
    }

    #[tokio::test]
    async fn counts_successful_sends() {
        let quota = Arc::new(CountingQuota::default());
        let (service, _) = console_service(Arc::clone(&quota));
        service.send("tenant-1", message()).await.unwrap();
        assert_eq!(quota.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn quota_failure_does_not_fail_send() {
        let quota = Arc::new(CountingQuota {
            fail: true,
            ..CountingQuota::default()
        });
        let (service, _) = console_service(Arc::clone(&quota));
        assert!(service.send("tenant-1", message()).await.is_ok());
        assert_eq!(quota.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hydration_error_stops_send() {
        let quota = Arc::new(CountingQuota::default());
        let (service, buf) = console_service(Arc::clone(&quota));
        let mut msg = message();
        msg.attachments.push(Attachment::default());

        let err = service.send("tenant-1", msg).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingAttachmentSource { index: 0 })
        ));
        assert!(buf.lock().unwrap().is_empty());
        assert_eq!(quota.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn preview_returns_raw_message() {
        let (service, buf) = console_service(NoopQuota);
        let raw = String::from_utf8(service.preview(message()).await.unwrap()).unwrap();
        assert!(raw.contains("Subject: S\r\n"));
        assert!(raw.contains("Content-Type: text/plain; charset=UTF-8\r\n"));
        assert!(buf.lock().unwrap().is_empty());
    }
}
