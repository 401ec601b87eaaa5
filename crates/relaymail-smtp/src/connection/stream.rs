//! Low-level SMTP stream handling.

use crate::error::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::trace;

/// Buffered plain-TCP connection to a relay.
#[derive(Debug)]
pub struct SmtpStream(BufReader<TcpStream>);

impl SmtpStream {
    /// Wraps an already connected TCP stream.
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self(BufReader::new(stream))
    }

    /// Reads a line from the stream, without its line ending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] at end of stream, or an I/O error
    /// if the read fails.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.0.read_line(&mut line).await? == 0 {
            return Err(Error::ConnectionClosed);
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        trace!(line = %line, "S:");
        Ok(line)
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.0.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }
}

/// Connects to an SMTP relay over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(hostname: &str, port: u16) -> Result<SmtpStream> {
    let stream = TcpStream::connect((hostname, port)).await?;
    Ok(SmtpStream::new(stream))
}
