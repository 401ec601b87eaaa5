//! Monthly send counter collaborator.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Records that a tenant sent one more email this month.
///
/// Called after a successful hand-off. Failures are logged by the caller and
/// never undo the send.
#[async_trait]
pub trait QuotaRecorder: Send + Sync {
    /// Increments the tenant's monthly sent counter.
    async fn increment_monthly_sent(&self, tenant_id: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl<T: QuotaRecorder + ?Sized> QuotaRecorder for Arc<T> {
    async fn increment_monthly_sent(&self, tenant_id: &str) -> anyhow::Result<()> {
        (**self).increment_monthly_sent(tenant_id).await
    }
}

/// Recorder that ignores every increment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopQuota;

#[async_trait]
impl QuotaRecorder for NoopQuota {
    async fn increment_monthly_sent(&self, _tenant_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Recorder that only emits a log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingQuota;

#[async_trait]
impl QuotaRecorder for LoggingQuota {
    async fn increment_monthly_sent(&self, tenant_id: &str) -> anyhow::Result<()> {
        info!(tenant = %tenant_id, "monthly sent counter incremented");
        Ok(())
    }
}
