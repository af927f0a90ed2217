//! Outbound SMTP for the mailer relay.
//!
//! [`client::SmtpClient`] speaks plaintext SMTP to a single mail exchanger and
//! [`client::MessageBuilder`] turns an [`mailer_common::EmailMessage`] into the
//! bytes sent after `DATA`. There is no STARTTLS and no AUTH: mail goes
//! straight to the recipient's MX on port 25.

pub mod client;
