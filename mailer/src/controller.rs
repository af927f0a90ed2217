use std::sync::Arc;

use anyhow::Context;
use mailer_common::{Config, Signal, internal};
use mailer_delivery::{
    DeliveryEngine, Dispatcher, DnsResolver, MailServerResolver, StaticResolver,
};
use mailer_http::{AppState, HttpServer};
use tokio::sync::broadcast;

/// Owns the process: configuration, MX resolver and HTTP server.
pub struct Mailer {
    config: Arc<Config>,
    resolver: Arc<dyn MailServerResolver>,
}

impl Mailer {
    /// Builds the relay from a loaded configuration.
    ///
    /// `MAILER_MX_OVERRIDE` replaces DNS with a fixed mail server.
    ///
    /// # Errors
    ///
    /// Returns an error if the system resolver cannot be initialised or the
    /// override is not a `host:port` pair.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let resolver: Arc<dyn MailServerResolver> = match &config.mx_override {
            Some(address) => {
                internal!(level = INFO, "Routing all mail to {address}");
                Arc::new(
                    StaticResolver::from_address(address)
                        .with_context(|| format!("Invalid MX override '{address}'"))?,
                )
            }
            None => Arc::new(DnsResolver::new().context("Unable to initialise DNS resolver")?),
        };

        Ok(Self::with_resolver(config, resolver))
    }

    #[must_use]
    pub fn with_resolver(config: Config, resolver: Arc<dyn MailServerResolver>) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
        }
    }

    /// Wires the delivery engine into a bound, not yet serving, HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error if the listen port cannot be bound.
    pub async fn server(&self) -> anyhow::Result<HttpServer> {
        let engine = Arc::new(DeliveryEngine::new(
            Arc::clone(&self.config),
            Arc::clone(&self.resolver),
        ));
        let state = AppState::new(Arc::clone(&self.config), Dispatcher::new(engine));

        Ok(HttpServer::new(state).await?)
    }

    /// Serves until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot start or fails while running.
    pub async fn run(self) -> anyhow::Result<()> {
        let server = self.server().await?;
        let (sender, receiver) = broadcast::channel(1);

        internal!(level = INFO, "Mailer running on port {}", self.config.port);

        let serve = server.serve(receiver);
        tokio::pin!(serve);

        tokio::select! {
            r = &mut serve => return r.map_err(Into::into),
            r = shutdown(&sender) => r?,
        }

        serve.await?;
        internal!(level = INFO, "Shut down");

        Ok(())
    }
}

async fn shutdown(sender: &broadcast::Sender<Signal>) -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    sender
        .send(Signal::Shutdown)
        .context("HTTP server stopped listening for shutdown")?;

    Ok(())
}
