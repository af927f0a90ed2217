//! Test support utilities for delivery tests

pub mod mock_server;

pub use mock_server::{ConnectionLog, MockSmtpServer, SmtpCommand};
