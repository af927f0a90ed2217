//! Ordered failover across the inbox domain's mail exchangers.

use std::sync::Arc;

use mailer_common::{Config, EmailMessage};
use mailer_smtp::client::MessageBuilder;
use tracing::{debug, info, warn};

use crate::{
    MailServer, MailServerResolver,
    error::{DeliveryError, PermanentError},
    smtp_transaction::SmtpTransaction,
};

/// Delivers messages to the configured inbox via its domain's MX servers.
///
/// Holds nothing mutable, so one engine can serve any number of concurrent
/// deliveries.
pub struct DeliveryEngine {
    config: Arc<Config>,
    resolver: Arc<dyn MailServerResolver>,
}

impl DeliveryEngine {
    #[must_use]
    pub fn new(config: Arc<Config>, resolver: Arc<dyn MailServerResolver>) -> Self {
        Self { config, resolver }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Delivers `message` to the inbox.
    ///
    /// 1. Resolve the MX records of the inbox domain. A failed lookup ends the
    ///    send before any connection is made.
    /// 2. Try each server in resolver order, rebuilding the message for every
    ///    attempt.
    /// 3. Stop at the first server that accepts the message.
    ///
    /// # Errors
    ///
    /// Returns the lookup error, [`PermanentError::NoMailServers`] if the
    /// lookup produced no servers, or the error of the last server tried.
    pub async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        let domain = self.config.inbox_domain();
        let candidates = candidates(self.resolver.resolve_mail_servers(domain).await?);

        let mut last_error = None;

        for server in &candidates {
            match self.attempt(server, message).await {
                Ok(()) => {
                    info!(server = %server.address(), rcpt_to = %self.config.inbox, "Message delivered");
                    return Ok(());
                }
                Err(e) => {
                    warn!(server = %server.address(), error = %e, "Received error from mx server");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PermanentError::NoMailServers(domain.to_string()).into()))
    }

    async fn attempt(&self, server: &MailServer, message: &EmailMessage) -> Result<(), DeliveryError> {
        let data = MessageBuilder::for_message(message, &self.config.inbox).build()?;
        let address = server.address();

        info!(
            server = %address,
            smtp_from = %self.config.sender,
            rcpt_to = %self.config.inbox,
            "Attempting send"
        );
        debug!(server = %address, "Message content:\n{}", String::from_utf8_lossy(&data));

        SmtpTransaction::new(
            address,
            &self.config.helo_name,
            &self.config.sender,
            &self.config.inbox,
            &data,
        )
        .execute()
        .await
    }
}

/// Turns resolver output into connectable candidates.
///
/// Order is preserved; only the trailing root-label dot is removed from each
/// host.
fn candidates(servers: Vec<MailServer>) -> Vec<MailServer> {
    servers
        .into_iter()
        .map(|server| MailServer {
            host: server.host.trim_end_matches('.').to_string(),
            ..server
        })
        .collect()
}
