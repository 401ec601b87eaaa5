//! # relaymail-smtp
//!
//! Minimal SMTP client for handing messages to a local relay (RFC 5321).
//!
//! ## Features
//!
//! - **Type-state connection management**: compile-time enforcement of valid
//!   SMTP state transitions
//! - **Protocol**: EHLO, MAIL FROM, RCPT TO, DATA, QUIT
//! - **Extensions**: SIZE (checked before MAIL FROM), 8BITMIME
//!
//! The client speaks plain TCP without authentication. It is meant for
//! development relays such as a local mail catcher.
//!
//! ## Quick Start
//!
//! ```ignore
//! use relaymail_smtp::{Address, Client};
//! use relaymail_smtp::connection::connect;
//!
//! let stream = connect("localhost", 1025).await?;
//! let client = Client::from_stream(stream).await?.ehlo("localhost").await?;
//!
//! let message = b"Subject: Test\r\n\r\nHello, World!\r\n";
//! let client = client
//!     .mail_from(Address::new("sender@example.com")?, Some(message.len()))
//!     .await?
//!     .rcpt_to(Address::new("recipient@example.com")?)
//!     .await?
//!     .data()
//!     .await?
//!     .send_message(message)
//!     .await?;
//! client.quit().await?;
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── mail_from() ──→ MailTransaction ── rcpt_to() ──→ RecipientAdded
//!     ↑                                                              │
//!     └────────────── send_message() ←── Data ←──── data() ──────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Client, Connected, Data, MailTransaction, RecipientAdded, ServerInfo, SmtpConnection,
};
pub use error::{Error, Result};
pub use types::{Address, Extension, Reply, ReplyCode};
