//! SMTP transaction execution module
//!
//! Runs one plaintext delivery against one mail server:
//! - greeting and EHLO (HELO if EHLO is refused)
//! - MAIL FROM with the configured envelope sender
//! - RCPT TO for the single inbox
//! - DATA and the message content
//! - QUIT, best-effort
//!
//! No STARTTLS and no AUTH are attempted.

use mailer_smtp::client::SmtpClient;
use tracing::{debug, warn};

use crate::error::{DeliveryError, PermanentError, TemporaryError};

/// A single SMTP transaction delivering one message to one server.
pub struct SmtpTransaction<'a> {
    /// The SMTP server address (host:port)
    server_address: String,
    /// Name announced in EHLO/HELO
    helo_name: &'a str,
    /// Envelope sender (`MAIL FROM`)
    sender: &'a str,
    /// Envelope recipient (`RCPT TO`)
    recipient: &'a str,
    /// Serialized message
    data: &'a [u8],
}

impl<'a> SmtpTransaction<'a> {
    #[must_use]
    pub const fn new(
        server_address: String,
        helo_name: &'a str,
        sender: &'a str,
        recipient: &'a str,
        data: &'a [u8],
    ) -> Self {
        Self {
            server_address,
            helo_name,
            sender,
            recipient,
            data,
        }
    }

    /// Execute the complete SMTP transaction
    ///
    /// # Errors
    /// Returns an error if any part of the SMTP transaction fails
    #[tracing::instrument(level = "debug", skip(self), fields(server = %self.server_address), err(Display))]
    pub async fn execute(self) -> Result<(), DeliveryError> {
        let mut client = self.connect_and_greet().await?;

        self.hello(&mut client).await?;
        self.send_mail_from(&mut client).await?;
        self.send_rcpt_to(&mut client).await?;
        self.send_message_data(&mut client).await?;

        // The message is already accepted at this point
        if let Err(e) = client.quit().await {
            warn!(
                server = %self.server_address,
                "QUIT failed after successful delivery: {e}"
            );
        }

        Ok(())
    }

    async fn connect_and_greet(&self) -> Result<SmtpClient, DeliveryError> {
        let mut client = SmtpClient::connect(&self.server_address)
            .await
            .map_err(|e| {
                TemporaryError::ConnectionFailed(format!(
                    "Failed to connect to {}: {e}",
                    self.server_address
                ))
            })?;

        let greeting = client.read_greeting().await?;

        if !greeting.is_success() {
            return Err(TemporaryError::ServerBusy(format!(
                "Server rejected connection: {greeting}"
            ))
            .into());
        }

        Ok(client)
    }

    /// EHLO, falling back to HELO for servers that only speak RFC 821.
    async fn hello(&self, client: &mut SmtpClient) -> Result<(), DeliveryError> {
        let ehlo_response = client.ehlo(self.helo_name).await?;
        if ehlo_response.is_success() {
            return Ok(());
        }

        debug!(
            server = %self.server_address,
            response = %ehlo_response,
            "EHLO refused, falling back to HELO"
        );

        let helo_response = client.helo(self.helo_name).await?;
        if helo_response.is_success() {
            Ok(())
        } else {
            Err(TemporaryError::SmtpTemporary(format!(
                "Server rejected HELO: {helo_response}"
            ))
            .into())
        }
    }

    async fn send_mail_from(&self, client: &mut SmtpClient) -> Result<(), DeliveryError> {
        let response = client.mail_from(self.sender).await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::from_reply(
                &response,
                format!("Server rejected MAIL FROM: {response}"),
                PermanentError::MessageRejected,
            ))
        }
    }

    async fn send_rcpt_to(&self, client: &mut SmtpClient) -> Result<(), DeliveryError> {
        let response = client.rcpt_to(self.recipient).await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::from_reply(
                &response,
                format!("Server rejected RCPT TO {}: {response}", self.recipient),
                PermanentError::InvalidRecipient,
            ))
        }
    }

    async fn send_message_data(&self, client: &mut SmtpClient) -> Result<(), DeliveryError> {
        let data_response = client.data().await?;

        if !data_response.is_intermediate() {
            return Err(DeliveryError::from_reply(
                &data_response,
                format!("Server rejected DATA: {data_response}"),
                PermanentError::MessageRejected,
            ));
        }

        let send_response = client.send_data(self.data).await?;

        if send_response.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::from_reply(
                &send_response,
                format!("Server rejected message data: {send_response}"),
                PermanentError::MessageRejected,
            ))
        }
    }
}
