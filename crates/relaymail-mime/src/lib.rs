//! # relaymail-mime
//!
//! MIME message generation for outbound transactional email.
//!
//! ## Features
//!
//! - **Message generation**: `multipart/mixed` messages with a nested
//!   `multipart/alternative` text/HTML body and Base64 attachments
//! - **Encoding**: Base64 with RFC 2045 line wrapping, Quoted-Printable,
//!   RFC 2047 header encoding
//! - **Addresses**: mailbox formatting and `"Name <addr>"` extraction
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaymail_mime::{Attachment, Mailbox, MessageBuilder};
//!
//! let raw = MessageBuilder::new()
//!     .from(Mailbox::with_name("Acme", "noreply@acme.test"))
//!     .to(Mailbox::new("user@example.com"))
//!     .subject("Your receipt")
//!     .text_body("Thanks for your order.")
//!     .html_body("<p>Thanks for your order.</p>")
//!     .transactional(true)
//!     .attach(Attachment::new("receipt.pdf", "application/pdf", pdf_bytes))
//!     .build()?;
//! ```
//!
//! ### Address extraction
//!
//! ```
//! use relaymail_mime::extract_address;
//!
//! assert_eq!(extract_address("Jane Doe <j@x.com>"), "j@x.com");
//! assert_eq!(extract_address("j@x.com"), "j@x.com");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod builder;
mod content_type;
mod error;
mod header;

pub mod encoding;

pub use address::{Mailbox, extract_address};
pub use builder::{Attachment, DATE_FORMAT, MessageBuilder, TransferEncoding, generate_boundary};
pub use content_type::{ContentType, OCTET_STREAM};
pub use error::{Error, Result};
pub use header::Headers;
