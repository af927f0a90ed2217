//! Process configuration for the mailer.
//!
//! Everything is read from the environment exactly once at startup and then
//! shared read-only (behind an `Arc`) with the HTTP boundary and the delivery
//! engine. There is no global mutable state.
//!
//! | Variable                      | Required | Default     |
//! |-------------------------------|----------|-------------|
//! | `MAILER_INBOX`                | yes      |             |
//! | `MAILER_SENDER`               | yes      |             |
//! | `MAILER_WHITELISTED_DOMAIN`   | yes      |             |
//! | `MAILER_PORT`                 | no       | `8080`      |
//! | `MAILER_HELO_NAME`            | no       | `localhost` |
//! | `MAILER_MAX_CONCURRENT_SENDS` | no       | unbounded   |
//! | `MAILER_MX_OVERRIDE`          | no       | DNS lookup  |

use std::str::FromStr;

use thiserror::Error;
use tokio::sync::Semaphore;

pub const INBOX_VAR: &str = "MAILER_INBOX";
pub const SENDER_VAR: &str = "MAILER_SENDER";
pub const WHITELISTED_DOMAIN_VAR: &str = "MAILER_WHITELISTED_DOMAIN";
pub const PORT_VAR: &str = "MAILER_PORT";
pub const HELO_NAME_VAR: &str = "MAILER_HELO_NAME";
pub const MAX_CONCURRENT_SENDS_VAR: &str = "MAILER_MAX_CONCURRENT_SENDS";
pub const MX_OVERRIDE_VAR: &str = "MAILER_MX_OVERRIDE";

/// Errors raised while loading the configuration. All of them are fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MAILER_INBOX, MAILER_SENDER, and MAILER_WHITELISTED_DOMAIN must be set ({0} is missing)")]
    Missing(&'static str),

    #[error("{name} must be an address of the form user@domain, got '{value}'")]
    InvalidAddress { name: &'static str, value: String },

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Immutable process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The single inbox every message is delivered to.
    pub inbox: String,
    /// Envelope-from used for every SMTP transaction.
    pub sender: String,
    /// The only origin granted CORS access to `/send`.
    pub allowed_origin: String,
    /// HTTP listen port.
    pub port: u16,
    /// Name announced in EHLO/HELO.
    pub helo_name: String,
    /// Upper bound on concurrent deliveries, `None` for unbounded.
    pub max_concurrent_sends: Option<usize>,
    /// `host:port` used instead of the inbox domain's MX records.
    pub mx_override: Option<String>,
}

const fn default_port() -> u16 {
    8080
}

fn default_helo_name() -> String {
    "localhost".to_string()
}

impl Config {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required variable is unset or any value
    /// is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated the same as unset ones.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required variable is unset or any value
    /// is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let inbox = required(INBOX_VAR)?;
        let sender = required(SENDER_VAR)?;
        let allowed_origin = required(WHITELISTED_DOMAIN_VAR)?;

        for (name, value) in [(INBOX_VAR, &inbox), (SENDER_VAR, &sender)] {
            if domain_of(value).is_none() {
                return Err(ConfigError::InvalidAddress {
                    name,
                    value: value.clone(),
                });
            }
        }

        let port = get(PORT_VAR)
            .map(|value| parse(PORT_VAR, &value))
            .transpose()?
            .unwrap_or_else(default_port);

        let max_concurrent_sends = get(MAX_CONCURRENT_SENDS_VAR)
            .map(|value| {
                parse::<usize>(MAX_CONCURRENT_SENDS_VAR, &value).and_then(|bound| {
                    let reason = if bound == 0 {
                        "must be greater than zero".to_string()
                    } else if bound > Semaphore::MAX_PERMITS {
                        format!("must be at most {}", Semaphore::MAX_PERMITS)
                    } else {
                        return Ok(bound);
                    };

                    Err(ConfigError::InvalidValue {
                        name: MAX_CONCURRENT_SENDS_VAR,
                        value,
                        reason,
                    })
                })
            })
            .transpose()?;

        let mx_override = get(MX_OVERRIDE_VAR)
            .map(|value| {
                if is_host_port(&value) {
                    Ok(value)
                } else {
                    Err(ConfigError::InvalidValue {
                        name: MX_OVERRIDE_VAR,
                        value,
                        reason: "expected host:port".to_string(),
                    })
                }
            })
            .transpose()?;

        Ok(Self {
            inbox,
            sender,
            allowed_origin,
            port,
            helo_name: get(HELO_NAME_VAR).unwrap_or_else(default_helo_name),
            max_concurrent_sends,
            mx_override,
        })
    }

    /// Domain whose MX records route every delivery.
    ///
    /// Routing follows the configured inbox, never the submitted message.
    pub fn inbox_domain(&self) -> &str {
        domain_of(&self.inbox).unwrap_or_default()
    }

    /// Domain of the outbound sender, used to address error reports.
    pub fn sender_domain(&self) -> &str {
        domain_of(&self.sender).unwrap_or_default()
    }
}

/// Returns everything after the last `@`, or `None` if there is no `@` or
/// nothing follows it.
pub fn domain_of(address: &str) -> Option<&str> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
}

fn is_host_port(value: &str) -> bool {
    value
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
