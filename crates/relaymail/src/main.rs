//! `relaymail` - send one email described as JSON.
//!
//! Reads a message description from a file or stdin, runs it through the
//! configured transport and prints `true` on success. Transport settings
//! come from the environment (see [`MailerConfig::from_env`]).

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use relaymail_core::{LoggingQuota, MailService, MailerConfig, Message, Provider};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when the message description is at fault.
const EXIT_CLIENT_ERROR: u8 = 2;
/// Exit status for delivery and internal failures.
const EXIT_SERVER_ERROR: u8 = 1;

#[derive(Debug, Parser)]
#[command(name = "relaymail", version, about)]
struct Cli {
    /// JSON message description; `-` or omitted reads stdin.
    message: Option<PathBuf>,

    /// Transport to use, overriding `MAIL_PROVIDER` (dev, smtp, ses).
    #[arg(long)]
    provider: Option<Provider>,

    /// Tenant the send is recorded against.
    #[arg(long, default_value = "default")]
    tenant: String,

    /// Print the raw MIME message instead of sending it.
    #[arg(long)]
    raw: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relaymail=info,relaymail_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let client_error = is_client_error(&err);
            error!(client_error, "send failed: {err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(if client_error {
                EXIT_CLIENT_ERROR
            } else {
                EXIT_SERVER_ERROR
            })
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = MailerConfig::from_env().context("invalid mail configuration")?;
    if let Some(provider) = cli.provider {
        config.provider = provider;
    }
    debug!(provider = %config.provider, "configuration loaded");

    let message = read_message(cli.message.as_ref())?;
    let service = MailService::from_config(&config, LoggingQuota)?;

    if cli.raw {
        let raw = service.preview(message).await?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(&raw)?;
        stdout.flush()?;
        return Ok(());
    }

    service.send(&cli.tenant, message).await?;
    println!("true");
    Ok(())
}

/// The message description could not be read or parsed.
#[derive(Debug, Error)]
enum InputError {
    #[error("failed to read {path}")]
    File {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read message from stdin")]
    Stdin(#[source] io::Error),

    #[error("invalid message description")]
    Parse(#[from] serde_json::Error),
}

/// Input problems and rejected messages are the caller's fault.
fn is_client_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<InputError>().is_some()
        || err
            .downcast_ref::<relaymail_core::Error>()
            .is_some_and(relaymail_core::Error::is_client_error)
}

fn read_message(path: Option<&PathBuf>) -> Result<Message, InputError> {
    let json = match path {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::read_to_string(path).map_err(|source| InputError::File {
                path: path.display().to_string(),
                source,
            })?
        }
        _ => {
            let mut json = String::new();
            io::stdin()
                .read_to_string(&mut json)
                .map_err(InputError::Stdin)?;
            json
        }
    };
    parse_message(&json)
}

fn parse_message(json: &str) -> Result<Message, InputError> {
    Ok(serde_json::from_str(json)?)
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
    fn parses_arguments() {
        let cli = Cli::try_parse_from([
            "relaymail",
            "msg.json",
            "--provider",
            "mailpit",
            "--tenant",
            "acme",
        ])
        .unwrap();
        assert_eq!(cli.message, Some(PathBuf::from("msg.json")));
        assert_eq!(cli.provider, Some(Provider::Smtp));
        assert_eq!(cli.tenant, "acme");
        assert!(!cli.raw);
    }

    #[test]
    fn defaults_to_stdin_and_default_tenant() {
        let cli = Cli::try_parse_from(["relaymail"]).unwrap();
        assert!(cli.message.is_none());
        assert_eq!(cli.tenant, "default");
        assert!(cli.provider.is_none());
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(Cli::try_parse_from(["relaymail", "--provider", "fax"]).is_err());
    }

    #[test]
    fn reads_message_file() {
        let path = std::env::temp_dir().join(format!("relaymail-test-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"to":"c@d.com","subject":"S"}"#).unwrap();
        let message = read_message(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(message.to, "c@d.com");
        assert_eq!(message.subject, "S");
    }

    #[test]
    fn unparsable_input_is_client_error() {
        for json in [
            "{not json",
            r#"{"to":"c@d.com","attachments":[{"body":"not base64!"}]}"#,
        ] {
            let err = anyhow::Error::from(parse_message(json).unwrap_err())
                .context("while sending");
            assert!(is_client_error(&err), "{json}");
        }
    }

    #[test]
    fn missing_file_is_client_error() {
        let path = PathBuf::from("/nonexistent/relaymail/message.json");
        let err = anyhow::Error::from(read_message(Some(&path)).unwrap_err());
        assert!(is_client_error(&err));
    }

    #[test]
    fn core_errors_keep_their_class() {
        let validation = relaymail_core::Error::from(relaymail_core::ValidationError::InvalidTo);
        assert!(is_client_error(&anyhow::Error::from(validation)));

        let transport = relaymail_core::Error::from(relaymail_core::TransportError::Timeout(5));
        assert!(!is_client_error(&anyhow::Error::from(transport)));
    }
}
