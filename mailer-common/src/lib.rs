pub mod config;
pub mod logging;
pub mod message;

pub use config::{Config, ConfigError};
pub use message::EmailMessage;
pub use tracing;

/// Broadcast to long-running tasks when the process is asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
