//! Serializes an [`EmailMessage`] into an RFC 5322 byte stream.

use std::io::Write;

use mailer_common::EmailMessage;

use super::error::{ClientError, Result};

/// Builds the plain-text message sent after `DATA`.
///
/// The output carries exactly `From`, `To`, `Subject` and the MIME headers
/// declaring a UTF-8 `text/plain` body. Nothing time- or randomness-dependent
/// is emitted, so identical input always yields identical bytes.
///
/// Header values are written verbatim. A `from` containing CR/LF will inject
/// additional headers; callers that care must reject such input themselves.
///
/// ```
/// use mailer_common::EmailMessage;
/// use mailer_smtp::client::MessageBuilder;
///
/// let message = EmailMessage::new("visitor@example.net", "Hello", "Hi there");
/// let bytes = MessageBuilder::for_message(&message, "inbox@example.com")
///     .build()
///     .unwrap();
///
/// assert!(bytes.starts_with(b"From: visitor@example.net\r\n"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MessageBuilder<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

impl<'a> MessageBuilder<'a> {
    /// Prepares `message` for delivery to the single `inbox` recipient.
    #[must_use]
    pub fn for_message(message: &'a EmailMessage, inbox: &'a str) -> Self {
        Self {
            from: &message.from,
            to: inbox,
            subject: &message.subject,
            body: &message.body,
        }
    }

    /// Serializes the message.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::BuilderError` if the message cannot be written.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut message =
            Vec::with_capacity(128 + self.from.len() + self.to.len() + self.body.len());

        self.write_to(&mut message)
            .map_err(|e| ClientError::BuilderError(e.to_string()))?;

        Ok(message)
    }

    fn write_to(&self, message: &mut impl Write) -> std::io::Result<()> {
        write!(message, "From: {}\r\n", self.from)?;
        write!(message, "To: {}\r\n", self.to)?;
        write!(message, "Subject: {}\r\n", self.subject)?;
        write!(message, "MIME-Version: 1.0\r\n")?;
        write!(message, "Content-Type: text/plain; charset=utf-8\r\n")?;
        write!(message, "\r\n")?;
        write!(message, "{}", self.body)
    }
}
