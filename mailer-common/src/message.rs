use serde::Deserialize;

/// Subject given to every web form submission.
pub const WEB_INQUIRY_SUBJECT: &str = "New Web Inquiry";

/// Subject given to internal failure reports.
pub const ERROR_REPORT_SUBJECT: &str = "Application Error";

/// A single message headed for the configured inbox.
///
/// The destination is deliberately absent: it is process configuration, so a
/// caller can never steer where mail goes. `from` and `body` come straight
/// from the caller and are not sanitized. `subject` is never read from the
/// caller; the HTTP boundary sets it after deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmailMessage {
    #[serde(rename = "From", alias = "from")]
    pub from: String,
    #[serde(skip_deserializing)]
    pub subject: String,
    #[serde(rename = "Body", alias = "body")]
    pub body: String,
}

impl EmailMessage {
    pub fn new(from: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Replaces whatever subject the message carries.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }
}
