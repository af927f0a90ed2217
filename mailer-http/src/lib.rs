//! HTTP boundary of the mailer relay.
//!
//! Validates `POST /send` requests, answers CORS preflights for the single
//! allowed origin and hands accepted messages to the delivery
//! [`Dispatcher`](mailer_delivery::Dispatcher) without waiting for them.

mod error;
mod routes;
mod server;

pub use error::{HttpError, RejectReason};
pub use routes::{ALLOWED_HEADERS, AppState, MAX_BODY_BYTES, SEND_PATH, router};
pub use server::HttpServer;
