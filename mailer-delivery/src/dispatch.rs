use std::sync::Arc;

use mailer_common::{EmailMessage, internal};
use tokio::{sync::Semaphore, task::JoinHandle};
use tracing::error;

use crate::{DeliveryEngine, ErrorReporter};

/// Detaches deliveries from the code that requested them.
///
/// Callers get control back immediately; the outcome of a delivery is only
/// ever observed in the logs and, on failure, in the error report.
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<DeliveryEngine>,
    reporter: ErrorReporter,
    permits: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    /// Creates a dispatcher bounded by the engine's `max_concurrent_sends`.
    #[must_use]
    pub fn new(engine: Arc<DeliveryEngine>) -> Self {
        let permits = engine
            .config()
            .max_concurrent_sends
            .map(|bound| Arc::new(Semaphore::new(bound)));

        Self {
            reporter: ErrorReporter::new(Arc::clone(&engine)),
            engine,
            permits,
        }
    }

    /// Starts delivering `message` in the background.
    ///
    /// The handle is only useful to tests; production callers drop it.
    pub fn dispatch(&self, message: EmailMessage) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.deliver(message).await })
    }

    async fn deliver(self, message: EmailMessage) {
        // Held until the delivery and any error report are finished.
        let _permit = match &self.permits {
            Some(permits) => Arc::clone(permits).acquire_owned().await.ok(),
            None => None,
        };

        internal!(level = DEBUG, "Delivering message from {}", message.from);

        if let Err(e) = self.engine.send(&message).await {
            error!(from = %message.from, error = %e, "Unable to deliver message");
            self.reporter.report(&e).await;
        }
    }
}
