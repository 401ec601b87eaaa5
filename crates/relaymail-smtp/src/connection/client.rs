//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::{Command, encode_message_data};
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, Extension, Reply, ReplyCode};
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::debug;

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the relay information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the relay greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or the relay refuses
    /// the session.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(greeting.into_error());
        }

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the relay's extensions.
    ///
    /// A relay that answers EHLO with a 5xx reply is greeted with HELO
    /// instead and treated as having no extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is refused.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        if reply.code.is_permanent() {
            debug!(code = %reply.code, "EHLO refused, falling back to HELO");
            self.send_command(Command::Helo {
                hostname: client_hostname.to_string(),
            })
            .await?
            .expect_success()?;
            self.server_info.extensions.clear();
            return Ok(self);
        }

        // First line is the relay's greeting, the rest are keywords.
        self.server_info.extensions = reply
            .expect_success()?
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        debug!(extensions = ?self.server_info.extensions, "EHLO accepted");
        Ok(self)
    }

    /// Starts a mail transaction.
    ///
    /// `message_size` is announced with the SIZE parameter when the relay
    /// supports it. `BODY=8BITMIME` is requested when advertised.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] without contacting the relay when
    /// the size exceeds the advertised limit, or an error if MAIL FROM fails.
    pub async fn mail_from(
        mut self,
        from: Address,
        message_size: Option<usize>,
    ) -> Result<Client<MailTransaction>> {
        if let (Some(size), Some(limit)) = (message_size, self.server_info.max_message_size())
            && size > limit
        {
            return Err(Error::MessageTooLarge { size, limit });
        }

        let body = self
            .server_info
            .supports_8bitmime()
            .then(|| "8BITMIME".to_string());
        let size = message_size.filter(|_| {
            self.server_info
                .extensions
                .iter()
                .any(|ext| matches!(ext, Extension::Size(_)))
        });

        self.send_command(Command::MailFrom { from, body, size })
            .await?
            .expect_success()?;
        Ok(self.transition())
    }
}

impl Client<MailTransaction> {
    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        self.send_command(Command::RcptTo { to })
            .await?
            .expect_success()?;
        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.send_command(Command::RcptTo { to })
            .await?
            .expect_success()?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error unless the relay answers DATA with 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(reply.into_error());
        }
        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF and leading dots are stuffed. The
    /// terminating `.` line is added automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails or the relay rejects the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Connected>> {
        let data = encode_message_data(message);
        self.stream.write_all(&data).await?;
        read_reply(&mut self.stream).await?.expect_success()?;
        Ok(self.transition())
    }
}

impl<S> Client<S> {
    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        self.stream.write_all(&cmd.serialize()).await?;
        read_reply(&mut self.stream).await
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(())
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        let is_last = is_last_reply_line(&line);
        lines.push(line);
        if is_last {
            break;
        }
    }
    parse_reply(&lines)
}
