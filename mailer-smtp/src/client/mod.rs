//! Plaintext SMTP client.
//!
//! ```no_run
//! use mailer_common::EmailMessage;
//! use mailer_smtp::client::{MessageBuilder, SmtpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let message = EmailMessage::new("visitor@example.net", "Hello", "Hi there");
//! let bytes = MessageBuilder::for_message(&message, "inbox@example.com").build()?;
//!
//! let mut client = SmtpClient::connect("mx.example.com:25").await?;
//! client.read_greeting().await?;
//! client.ehlo("localhost").await?;
//! client.mail_from("noreply@example.org").await?;
//! client.rcpt_to("inbox@example.com").await?;
//! client.data().await?;
//! client.send_data(&bytes).await?;
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod message;
mod response;
mod smtp_client;

pub use error::{ClientError, Result};
pub use message::MessageBuilder;
pub use response::{Response, ResponseLine};
pub use smtp_client::{SmtpClient, dot_stuff};
