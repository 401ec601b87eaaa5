//! # relaymail-core
//!
//! Outbound email pipeline for transactional and bulk messages.
//!
//! This crate provides:
//! - The [`Message`] model, deserializable from the JSON request shape
//! - Attachment hydration from remote URLs ([`Hydrator`])
//! - Text/HTML body resolution ([`resolve_bodies`])
//! - Raw MIME building ([`build_raw_message`])
//! - Three interchangeable transports: console, local SMTP relay and the
//!   Amazon SES v2 API ([`Transport`])
//! - Send orchestration with a quota collaborator ([`MailService`])
//!
//! ```ignore
//! use relaymail_core::{LoggingQuota, MailService, MailerConfig, Message};
//!
//! let config = MailerConfig::from_env()?;
//! let service = MailService::from_config(&config, LoggingQuota)?;
//! let message: Message = serde_json::from_str(request_body)?;
//! service.send("tenant-42", message).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod body;
pub mod config;
mod error;
mod hydrate;
mod model;
pub mod quota;
mod raw;
mod service;
pub mod transport;

pub use body::{resolve_bodies, strip_tags};
pub use config::{MailerConfig, Provider};
pub use error::{Error, FetchError, Result, TransportError, ValidationError};
pub use hydrate::Hydrator;
pub use model::{Attachment, Message};
pub use quota::{LoggingQuota, NoopQuota, QuotaRecorder};
pub use raw::{build_raw_message, message_builder};
pub use relaymail_mime::extract_address;
pub use service::MailService;
pub use transport::{CloudTransport, ConsoleSink, ConsoleTransport, RelayTransport, Transport};
