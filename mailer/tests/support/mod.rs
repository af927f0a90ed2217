//! Test support utilities for end-to-end testing
//!
//! Starts the relay's HTTP server in-process with every delivery routed to a
//! mock SMTP server, so a test can follow a submission from the HTTP request
//! to the bytes the mail server received.

#[path = "../../../mailer-delivery/tests/support/mock_server.rs"]
pub mod mock_server;

pub use harness::E2ETestHarness;
pub use mock_server::SmtpCommand;
