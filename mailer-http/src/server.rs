//! HTTP server for the `/send` endpoint

use std::net::SocketAddr;

use axum::Router;
use mailer_common::Signal;
use tokio::{net::TcpListener, sync::broadcast};

use crate::{AppState, HttpError, router};

/// Serves the relay's HTTP interface until shutdown.
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
}

impl HttpServer {
    /// Binds to all interfaces on the configured port.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn new(state: AppState) -> Result<Self, HttpError> {
        let address = format!("0.0.0.0:{}", state.config().port);
        Self::bind(&address, state).await
    }

    /// Binds to an explicit address, e.g. `127.0.0.1:0` in tests.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn bind(address: &str, state: AppState) -> Result<Self, HttpError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| HttpError::BindError {
                address: address.to_string(),
                source: e,
            })?;

        tracing::info!(address = %address, "HTTP server bound successfully");

        Ok(Self {
            listener,
            router: router(state),
        })
    }

    /// The address actually bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, HttpError> {
        self.listener
            .local_addr()
            .map_err(|e| HttpError::ServerError(e.to_string()))
    }

    /// Run the server until a shutdown signal is received
    ///
    /// Deliveries already dispatched are not waited for.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<Signal>) -> Result<(), HttpError> {
        tracing::info!("HTTP server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await
            .map_err(|e| HttpError::ServerError(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
