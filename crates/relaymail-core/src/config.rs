//! Mailer configuration.
//!
//! Configuration is built once (from a file, the environment or code) and
//! passed explicitly into [`Transport::from_config`](crate::Transport::from_config)
//! and [`MailService::from_config`](crate::MailService::from_config).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default relay host (a local mail catcher such as Mailpit).
pub const DEFAULT_RELAY_HOST: &str = "localhost";
/// Default relay port.
pub const DEFAULT_RELAY_PORT: u16 = 1025;
/// Default name announced in `EHLO`.
pub const DEFAULT_HELLO_NAME: &str = "localhost";

/// Errors while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Unrecognized provider name.
    #[error("unknown mail provider: {0:?}")]
    UnknownProvider(String),

    /// A numeric setting could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidNumber {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Which transport delivers messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Console rendering, no network.
    #[default]
    Dev,
    /// Local no-auth SMTP relay.
    Smtp,
    /// Amazon SES API.
    Ses,
}

impl Provider {
    /// Canonical provider name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Smtp => "smtp",
            Self::Ses => "ses",
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "dev" | "console" => Ok(Self::Dev),
            "smtp" | "local" | "mailpit" => Ok(Self::Smtp),
            "ses" | "cloud" => Ok(Self::Ses),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Relay hostname.
    pub host: String,
    /// Relay port.
    pub port: u16,
    /// Name announced in `EHLO`.
    pub hello_name: String,
    /// Upper bound for connect plus the whole dialogue, in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RELAY_HOST.to_string(),
            port: DEFAULT_RELAY_PORT,
            hello_name: DEFAULT_HELLO_NAME.to_string(),
            timeout_secs: None,
        }
    }
}

impl RelayConfig {
    /// Dialogue timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Cloud API settings. Unset values fall back to the `AWS_*` environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Delivery region, e.g. `us-east-1`.
    pub region: Option<String>,
    /// Endpoint override (defaults to the regional SES endpoint).
    pub endpoint: Option<String>,
    /// Access key ID.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
}

/// Attachment download settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout, in seconds.
    pub timeout_secs: Option<u64>,
}

impl FetchConfig {
    /// Request timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Complete mailer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailerConfig {
    /// Selected transport.
    pub provider: Provider,
    /// Local relay settings.
    pub relay: RelayConfig,
    /// Cloud API settings.
    pub cloud: CloudConfig,
    /// Attachment download settings.
    pub fetch: FetchConfig,
}

impl MailerConfig {
    /// Reads configuration from process environment variables.
    ///
    /// | variable | setting |
    /// |---|---|
    /// | `MAIL_PROVIDER` | provider (`dev`, `smtp`, `ses` and aliases) |
    /// | `SMTP_RELAY_HOST`, `SMTP_RELAY_PORT` | relay address |
    /// | `SMTP_TIMEOUT_SECS` | relay timeout |
    /// | `MAIL_REGION`, then `AWS_REGION` | cloud region |
    /// | `MAIL_API_ENDPOINT` | cloud endpoint override |
    /// | `MAIL_FETCH_TIMEOUT_SECS` | attachment download timeout |
    ///
    /// Cloud credentials are not copied here; they are read from the
    /// environment when a message is sent.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider or a malformed number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider or a malformed number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(provider) = get("MAIL_PROVIDER") {
            config.provider = provider.parse()?;
        }
        if let Some(host) = get("SMTP_RELAY_HOST") {
            config.relay.host = host.trim().to_string();
        }
        if let Some(port) = get("SMTP_RELAY_PORT") {
            config.relay.port = parse_number("SMTP_RELAY_PORT", &port)?;
        }
        if let Some(secs) = get("SMTP_TIMEOUT_SECS") {
            config.relay.timeout_secs = Some(parse_number("SMTP_TIMEOUT_SECS", &secs)?);
        }
        config.cloud.region = get("MAIL_REGION").or_else(|| get("AWS_REGION"));
        config.cloud.endpoint = get("MAIL_API_ENDPOINT");
        if let Some(secs) = get("MAIL_FETCH_TIMEOUT_SECS") {
            config.fetch.timeout_secs = Some(parse_number("MAIL_FETCH_TIMEOUT_SECS", &secs)?);
        }

        Ok(config)
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_string(),
    })
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
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn provider_aliases() {
        assert_eq!("dev".parse::<Provider>().unwrap(), Provider::Dev);
        assert_eq!("Console".parse::<Provider>().unwrap(), Provider::Dev);
        assert_eq!("mailpit".parse::<Provider>().unwrap(), Provider::Smtp);
        assert_eq!(" local ".parse::<Provider>().unwrap(), Provider::Smtp);
        assert_eq!("SES".parse::<Provider>().unwrap(), Provider::Ses);
        assert_eq!("cloud".parse::<Provider>().unwrap(), Provider::Ses);
        assert_eq!(
            "carrier-pigeon".parse::<Provider>(),
            Err(ConfigError::UnknownProvider("carrier-pigeon".into()))
        );
    }

    #[test]
    fn defaults() {
        let config = MailerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.provider, Provider::Dev);
        assert_eq!(config.relay.host, "localhost");
        assert_eq!(config.relay.port, 1025);
        assert_eq!(config.relay.hello_name, "localhost");
        assert_eq!(config.relay.timeout(), None);
        assert_eq!(config.cloud, CloudConfig::default());
    }

    #[test]
    fn reads_environment() {
        let config = MailerConfig::from_lookup(lookup(&[
            ("MAIL_PROVIDER", "ses"),
            ("SMTP_RELAY_HOST", "mailpit"),
            ("SMTP_RELAY_PORT", "2525"),
            ("SMTP_TIMEOUT_SECS", "5"),
            ("AWS_REGION", "eu-west-1"),
            ("MAIL_API_ENDPOINT", "http://127.0.0.1:4566"),
            ("MAIL_FETCH_TIMEOUT_SECS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.provider, Provider::Ses);
        assert_eq!(config.relay.host, "mailpit");
        assert_eq!(config.relay.port, 2525);
        assert_eq!(config.relay.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.cloud.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.cloud.endpoint.as_deref(), Some("http://127.0.0.1:4566"));
        assert_eq!(config.fetch.timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn mail_region_wins_over_aws_region() {
        let config = MailerConfig::from_lookup(lookup(&[
            ("MAIL_REGION", "us-west-2"),
            ("AWS_REGION", "eu-west-1"),
        ]))
        .unwrap();
        assert_eq!(config.cloud.region.as_deref(), Some("us-west-2"));
    }

    #[test]
    fn rejects_bad_port() {
        let err = MailerConfig::from_lookup(lookup(&[("SMTP_RELAY_PORT", "70000")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                name: "SMTP_RELAY_PORT",
                value: "70000".into()
            }
        );
    }

    #[test]
    fn deserializes_partial_json() {
        let config: MailerConfig =
            serde_json::from_str(r#"{"provider":"smtp","relay":{"port":2525}}"#).unwrap();
        assert_eq!(config.provider, Provider::Smtp);
        assert_eq!(config.relay.port, 2525);
        assert_eq!(config.relay.host, "localhost");
    }
}
