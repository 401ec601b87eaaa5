//! Error types for the core library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a send.
///
/// Each variant is one class of failure; the cause chain is kept through
/// `source()`.
#[derive(Debug, Error)]
pub enum Error {
    /// The message description is incomplete or malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An attachment could not be downloaded.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The raw message could not be serialized.
    #[error("Failed to build raw email: {0}")]
    Build(#[from] relaymail_mime::Error),

    /// The transport could not hand the message off.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Returns true when the caller is at fault (bad input), false when the
    /// failure happened on our side or downstream.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Build(_))
    }
}

/// Missing or malformed fields in the message description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `to` is empty or has no `@`.
    #[error("empty To email")]
    InvalidTo,

    /// `from` is empty or has no `@`.
    #[error("empty From email")]
    InvalidFrom,

    /// An attachment has neither content nor a URL to fetch it from.
    #[error("attachment {index} has no body and no URL")]
    MissingAttachmentSource {
        /// 0-based position in the attachment list.
        index: usize,
    },
}

/// Attachment download failure.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or no response arrived.
    #[error("failed to fetch attachment from {url}: {source}")]
    Request {
        /// Attachment URL.
        url: String,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The origin answered with something other than 200.
    #[error("failed to fetch attachment from {url}: status {status}")]
    Status {
        /// Attachment URL.
        url: String,
        /// HTTP status code received.
        status: u16,
    },

    /// The response body could not be read.
    #[error("failed to read attachment body from {url}: {source}")]
    Body {
        /// Attachment URL.
        url: String,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
}

/// Hand-off failure in a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The raw message could not be built inside the transport.
    #[error("failed to build raw email: {0}")]
    Build(#[source] relaymail_mime::Error),

    /// The console sink could not be written.
    #[error("failed to write console output: {0}")]
    Console(#[source] std::io::Error),

    /// The SMTP relay refused the connection or the message.
    #[error("failed to send email via SMTP relay: {0}")]
    Smtp(#[from] relaymail_smtp::Error),

    /// The relay dialogue did not finish in time.
    #[error("SMTP relay did not respond within {0} seconds")]
    Timeout(u64),

    /// Transport settings could not be resolved (region, credentials, endpoint).
    #[error("transport configuration error: {0}")]
    Config(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    /// The cloud API could not be reached.
    #[error("failed to reach email API: {0}")]
    Unreachable(String),

    /// The cloud API rejected the message.
    #[error("email API rejected the message ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error message.
        message: String,
    },
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
    fn client_errors_are_validation_and_build() {
        assert!(Error::from(ValidationError::InvalidTo).is_client_error());
        let io = std::io::Error::other("disk full");
        assert!(Error::from(relaymail_mime::Error::from(io)).is_client_error());
    }

    #[test]
    fn server_errors_are_fetch_and_transport() {
        let fetch = FetchError::Status {
            url: "http://x/y".into(),
            status: 404,
        };
        assert!(!Error::from(fetch).is_client_error());
        assert!(!Error::from(TransportError::Timeout(5)).is_client_error());
    }

    #[test]
    fn messages_name_the_cause() {
        let err = Error::from(FetchError::Status {
            url: "http://files.test/a.pdf".into(),
            status: 503,
        });
        assert_eq!(
            err.to_string(),
            "failed to fetch attachment from http://files.test/a.pdf: status 503"
        );
        assert_eq!(Error::from(ValidationError::InvalidTo).to_string(), "empty To email");
        assert_eq!(
            ValidationError::MissingAttachmentSource { index: 2 }.to_string(),
            "attachment 2 has no body and no URL"
        );
    }
}
