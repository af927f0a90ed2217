//! Direct-to-MX delivery for the mailer relay
//!
//! This module provides functionality to:
//! - Resolve the inbox domain's MX records
//! - Try each mail exchanger in order until one accepts the message
//! - Report terminal failures back to the inbox
//! - Detach deliveries from the caller (fire-and-forget)

mod dispatch;
mod dns;
mod engine;
mod error;
mod report;
mod smtp_transaction;

pub use dispatch::Dispatcher;
pub use dns::{DnsError, DnsResolver, MailServer, MailServerResolver, StaticResolver};
pub use engine::DeliveryEngine;
pub use error::{DeliveryError, PermanentError, SystemError, TemporaryError};
pub use report::{ErrorReporter, error_report};
