//! Typed error handling for delivery operations.
//!
//! Failures are split into:
//! - Permanent failures (5xx SMTP codes, unknown domains)
//! - Temporary failures (4xx SMTP codes, network trouble)
//! - System errors (message construction, protocol violations)
//!
//! The failover loop treats all of them alike and moves on to the next mail
//! server; the categories exist for logging and for the error report.

use mailer_smtp::client::{ClientError, Response};
use thiserror::Error;

use crate::DnsError;

/// Top-level delivery error type.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Permanent failure: {0}")]
    Permanent(#[from] PermanentError),

    #[error("Temporary failure: {0}")]
    Temporary(#[from] TemporaryError),

    #[error("System error: {0}")]
    System(#[from] SystemError),
}

#[derive(Debug, Error)]
pub enum PermanentError {
    /// Recipient address was rejected by the server.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Domain does not exist.
    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    /// Sender or message content was rejected by the server.
    #[error("Message rejected: {0}")]
    MessageRejected(String),

    /// No MX records for the domain.
    #[error("No mail servers available for domain: {0}")]
    NoMailServers(String),
}

#[derive(Debug, Error)]
pub enum TemporaryError {
    /// Failed to establish connection to the mail server.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Server refused the session (non-2xx greeting).
    #[error("Server busy: {0}")]
    ServerBusy(String),

    /// DNS lookup failed (temporary network issue).
    #[error("DNS lookup failed: {0}")]
    DnsLookupFailed(String),

    /// Server returned a temporary failure code.
    #[error("Temporary SMTP error: {0}")]
    SmtpTemporary(String),
}

#[derive(Debug, Error)]
pub enum SystemError {
    /// The message could not be serialized.
    #[error("Message construction failed: {0}")]
    MessageBuild(String),

    /// Protocol violation or other internal problem.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeliveryError {
    /// Classifies an unexpected reply to an SMTP command.
    ///
    /// 5xx replies become `permanent`, 4xx are temporary and any other code
    /// is a protocol violation.
    pub(crate) fn from_reply(
        response: &Response,
        message: String,
        permanent: fn(String) -> PermanentError,
    ) -> Self {
        if response.is_permanent_error() {
            permanent(message).into()
        } else if response.is_temporary_error() {
            TemporaryError::SmtpTemporary(message).into()
        } else {
            SystemError::Internal(format!("Unexpected reply: {message}")).into()
        }
    }
}

impl From<DnsError> for DeliveryError {
    fn from(error: DnsError) -> Self {
        match error {
            DnsError::NoMailServers(domain) => PermanentError::NoMailServers(domain).into(),
            DnsError::DomainNotFound(domain) => PermanentError::DomainNotFound(domain).into(),
            DnsError::LookupFailed(err) => TemporaryError::DnsLookupFailed(err.to_string()).into(),
        }
    }
}

/// Transport-level client errors.
///
/// Rejections by the server arrive as replies, not as `ClientError`s, and are
/// classified with [`DeliveryError::from_reply`].
impl From<ClientError> for DeliveryError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Io(e) => TemporaryError::ConnectionFailed(format!("I/O error: {e}")).into(),
            ClientError::ConnectionClosed => {
                TemporaryError::ConnectionFailed("Connection closed unexpectedly".to_string())
                    .into()
            }
            ClientError::ParseError(msg) => {
                SystemError::Internal(format!("SMTP protocol parse error: {msg}")).into()
            }
            ClientError::Utf8Error(e) => {
                SystemError::Internal(format!("UTF-8 decoding error: {e}")).into()
            }
            ClientError::BuilderError(msg) => SystemError::MessageBuild(msg).into(),
        }
    }
}
