//! Error reporting path.
//!
//! A delivery that fails on every mail server is reported by mail to the same
//! inbox, through the same engine. The report itself is best-effort: when it
//! fails too, the failure is logged and dropped.

use std::{fmt::Display, sync::Arc};

use mailer_common::{Config, EmailMessage, message::ERROR_REPORT_SUBJECT};
use tracing::{error, info};

use crate::DeliveryEngine;

/// Builds the report for `error`.
///
/// Sent from `errors@<sender domain>` so reports are easy to filter.
pub fn error_report(config: &Config, error: &dyn Display) -> EmailMessage {
    EmailMessage::new(
        format!("errors@{}", config.sender_domain()),
        ERROR_REPORT_SUBJECT,
        error.to_string(),
    )
}

/// Mails delivery failures to the inbox.
#[derive(Clone)]
pub struct ErrorReporter {
    engine: Arc<DeliveryEngine>,
}

impl ErrorReporter {
    #[must_use]
    pub const fn new(engine: Arc<DeliveryEngine>) -> Self {
        Self { engine }
    }

    /// Sends a report for `error`.
    ///
    /// Never fails and never reports its own failure.
    pub async fn report(&self, error: &(dyn Display + Sync)) {
        let report = error_report(self.engine.config(), error);

        match self.engine.send(&report).await {
            Ok(()) => info!(from = %report.from, "Error report delivered"),
            Err(e) => error!(
                original = %error,
                error = %e,
                "Unable to deliver error report, dropping it"
            ),
        }
    }
}
