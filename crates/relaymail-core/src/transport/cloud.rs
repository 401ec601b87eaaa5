//! Cloud transport: Amazon SES v2 `SendEmail` with a raw MIME payload.

use super::{require_from, require_to};
use crate::config::CloudConfig;
use crate::error::{Result, TransportError};
use crate::model::Message;
use crate::raw::build_raw_message;
use aws_config::BehaviorVersion;
use aws_sdk_sesv2::Client;
use aws_sdk_sesv2::config::{Credentials, Region};
use aws_sdk_sesv2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sesv2::operation::send_email::SendEmailError;
use aws_sdk_sesv2::primitives::Blob;
use aws_sdk_sesv2::types::{EmailContent, RawMessage};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Provider name attached to credentials taken from [`CloudConfig`].
const STATIC_PROVIDER: &str = "relaymail-config";

/// Sends raw messages through the SES v2 API.
///
/// Settings left unset in [`CloudConfig`] come from the AWS default provider
/// chain: environment variables, shared profile files, SSO, container and
/// instance roles. The SDK client is created on the first send and shared
/// between clones.
#[derive(Debug, Clone)]
pub struct CloudTransport {
    config: CloudConfig,
    client: Arc<OnceCell<Client>>,
}

impl CloudTransport {
    /// Creates a cloud transport.
    #[must_use]
    pub fn new(config: CloudConfig) -> Self {
        Self {
            config,
            client: Arc::default(),
        }
    }

    /// Builds `message` and submits it to the API.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing or malformed `to` or `from`,
    /// and [`TransportError`] when the region or credentials cannot be
    /// resolved, the build fails or the API rejects the request.
    pub async fn send(&self, message: &Message) -> Result<()> {
        require_to(message)?;
        require_from(message)?;

        let raw = build_raw_message(message).map_err(TransportError::Build)?;
        let client = self.client().await?;

        debug!(bytes = raw.len(), "submitting raw email");
        let raw = RawMessage::builder()
            .data(Blob::new(raw))
            .build()
            .map_err(|e| TransportError::Config(format!("invalid raw message: {e}")))?;
        let output = client
            .send_email()
            .content(EmailContent::builder().raw(raw).build())
            .send()
            .await
            .map_err(|err| send_error(&err))?;

        info!(
            message_id = output.message_id().unwrap_or_default(),
            to = %message.to,
            "email sent via API"
        );
        Ok(())
    }

    async fn client(&self) -> std::result::Result<&Client, TransportError> {
        self.client.get_or_try_init(|| self.load_client()).await
    }

    async fn load_client(&self) -> std::result::Result<Client, TransportError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = non_blank(self.config.region.as_deref()) {
            loader = loader.region(Region::new(region.to_string()));
        }
        if let Some(credentials) = self.static_credentials() {
            loader = loader.credentials_provider(credentials);
        }
        if let Some(endpoint) = non_blank(self.config.endpoint.as_deref()) {
            loader = loader.endpoint_url(endpoint.trim_end_matches('/'));
        }

        let sdk_config = loader.load().await;
        let region = sdk_config
            .region()
            .ok_or_else(|| TransportError::Config("no delivery region configured".into()))?;
        debug!(region = %region, "email API client ready");
        Ok(Client::new(&sdk_config))
    }

    /// Credentials pinned in configuration; both key parts must be present.
    fn static_credentials(&self) -> Option<Credentials> {
        let access_key_id = non_blank(self.config.access_key_id.as_deref())?;
        let secret_access_key = non_blank(self.config.secret_access_key.as_deref())?;
        Some(Credentials::new(
            access_key_id,
            secret_access_key,
            non_blank(self.config.session_token.as_deref()).map(str::to_string),
            None,
            STATIC_PROVIDER,
        ))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Sorts an SDK failure into rejection, connectivity or configuration.
///
/// Credential resolution happens while the request is dispatched, so a
/// dispatch failure that is neither I/O nor a timeout is a configuration
/// problem.
fn send_error(err: &SdkError<SendEmailError>) -> TransportError {
    match err {
        SdkError::ServiceError(context) => TransportError::Api {
            status: context.raw().status().as_u16(),
            message: context
                .err()
                .message()
                .map_or_else(|| context.err().to_string(), str::to_string),
        },
        SdkError::ResponseError(context) => TransportError::Api {
            status: context.raw().status().as_u16(),
            message: DisplayErrorContext(err).to_string(),
        },
        SdkError::DispatchFailure(failure) if failure.is_io() || failure.is_timeout() => {
            TransportError::Unreachable(DisplayErrorContext(err).to_string())
        }
        SdkError::TimeoutError(_) => {
            TransportError::Unreachable(DisplayErrorContext(err).to_string())
        }
        _ => TransportError::Config(DisplayErrorContext(err).to_string()),
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

    fn message(from: &str, to: &str) -> Message {
        Message {
            from: from.into(),
            to: to.into(),
            ..Message::default()
        }
    }

    #[tokio::test]
    async fn validates_recipient_first() {
        let err = CloudTransport::new(CloudConfig::default())
            .send(&message("a@b.com", "not-an-address"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::InvalidTo)));
    }

    #[tokio::test]
    async fn validates_sender() {
        let transport = CloudTransport::new(CloudConfig::default());
        for from in ["", "   ", "no-at-sign"] {
            let err = transport.send(&message(from, "c@d.com")).await.unwrap_err();
            assert!(matches!(err, Error::Validation(ValidationError::InvalidFrom)));
        }
        assert!(transport.client.get().is_none());
    }

    #[test]
    fn static_credentials_need_both_parts() {
        let config = CloudConfig {
            access_key_id: Some("AKID".into()),
            secret_access_key: Some(" secret ".into()),
            session_token: Some("  ".into()),
            ..CloudConfig::default()
        };
        let credentials = CloudTransport::new(config.clone()).static_credentials().unwrap();
        assert_eq!(credentials.access_key_id(), "AKID");
        assert_eq!(credentials.secret_access_key(), "secret");
        assert_eq!(credentials.session_token(), None);

        let partial = CloudConfig {
            secret_access_key: None,
            ..config
        };
        assert!(CloudTransport::new(partial).static_credentials().is_none());
    }

    #[test]
    fn blank_settings_are_unset() {
        assert_eq!(non_blank(Some("  us-east-1 ")), Some("us-east-1"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
