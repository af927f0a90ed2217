//! The `/send` endpoint.
//!
//! | Request                              | Response                  |
//! |--------------------------------------|---------------------------|
//! | `OPTIONS /send` from allowed origin  | 200 with CORS headers     |
//! | `OPTIONS /send` from anywhere else   | 200, no CORS headers      |
//! | anything other than `POST /send`     | 404                       |
//! | wrong `Content-Type`                 | 415                       |
//! | wrong `Accept`                       | 406                       |
//! | malformed body                       | 422                       |
//! | otherwise                            | 202, delivery detached    |
//!
//! Checks run top to bottom and the first failing one decides the response.

use std::{any::Any, sync::Arc};

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode,
        header::{
            ACCEPT, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN,
        },
    },
    response::{IntoResponse, Response},
    routing::post,
};
use mailer_common::{Config, EmailMessage, message::WEB_INQUIRY_SUBJECT};
use mailer_delivery::Dispatcher;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{debug, error, warn};

use crate::{HttpError, RejectReason};

pub const SEND_PATH: &str = "/send";

/// Headers a cross-origin caller may send with `POST /send`.
pub const ALLOWED_HEADERS: &str = "Accept, Content-Type, Content-Length, Accept-Encoding";

/// Largest request body read before giving up.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared, read-only state of every request handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    dispatcher: Dispatcher,
}

impl AppState {
    #[must_use]
    pub const fn new(config: Arc<Config>, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Builds the complete application router.
pub fn router(state: AppState) -> Router {
    with_layers(
        Router::new()
            .route(
                SEND_PATH,
                post(send).options(preflight).fallback(not_found),
            )
            .fallback(not_found)
            .with_state(state),
    )
}

/// Request tracing outermost, so panics turned into 500s are traced too.
fn with_layers(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(panic_response)),
    )
}

async fn not_found() -> RejectReason {
    RejectReason::NotFound
}

async fn preflight(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(origin) = headers
        .get(ORIGIN)
        .filter(|origin| origin.as_bytes() == state.config.allowed_origin.as_bytes())
    else {
        debug!(origin = ?headers.get(ORIGIN), "Preflight from an origin that is not allowed");
        return StatusCode::OK.into_response();
    };

    (
        StatusCode::OK,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone()),
            (ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST")),
            (
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            ),
        ],
    )
        .into_response()
}

async fn send(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode, HttpError> {
    check_content_type(&headers)?;
    check_accept(&headers)?;

    let body = axum::body::to_bytes(body, MAX_BODY_BYTES).await?;
    let message = parse_message(&body)?;

    if message.from.contains(['\r', '\n']) {
        warn!(from = ?message.from, "From contains a line break and will be written into the message headers as-is");
    }

    drop(
        state
            .dispatcher
            .dispatch(message.with_subject(WEB_INQUIRY_SUBJECT)),
    );

    Ok(StatusCode::ACCEPTED)
}

fn header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a [u8]> {
    headers.get(name).map(HeaderValue::as_bytes)
}

fn check_content_type(headers: &HeaderMap) -> Result<(), RejectReason> {
    match header(headers, &CONTENT_TYPE) {
        Some(b"application/json") => Ok(()),
        _ => Err(RejectReason::UnsupportedMediaType),
    }
}

fn check_accept(headers: &HeaderMap) -> Result<(), RejectReason> {
    match header(headers, &ACCEPT) {
        Some(b"*/*" | b"application/json") => Ok(()),
        _ => Err(RejectReason::NotAcceptable),
    }
}

fn parse_message(body: &Bytes) -> Result<EmailMessage, RejectReason> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Rejecting malformed request body");
        RejectReason::UnprocessableEntity
    })
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("Unknown panic");

    error!(panic = details, "Request handler panicked");

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    (status, status.as_str().to_string()).into_response()
}
