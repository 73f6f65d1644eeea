//! Error taxonomy for token creation.
//!
//! Field-level validation errors never leave the form (they resolve into
//! [`crate::field::FieldInput`] state); everything here is about what can go
//! wrong once a submit crosses into the token service. The core never
//! renders messages itself: translation to user-facing text is delegated to
//! an [`ErrorTranslator`] keyed off error category, while the structured
//! detail (status code, error code) stays available for support diagnostics.

use std::fmt;

/// Category of a structured API error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The card was declined or its data rejected; the payload message is
    /// meant for the cardholder.
    InvalidCard,
    /// Too many requests.
    RateLimited,
    /// Key/credential problem on the integrating app's side.
    Authorization,
    /// Any other client-side (4xx) application error.
    Application,
    /// Processor-side (5xx) failure.
    Server,
}

/// A structured error payload from the token service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status of the response.
    pub status: u16,
    /// Machine-readable error code from the payload, when present.
    pub code: Option<String>,
    /// Message from the payload.
    pub message: String,
    /// Coarse category used for message translation.
    pub kind: ApiErrorKind,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {} ({})", self.status, self.message, code),
            None => write!(f, "[{}] {}", self.status, self.message),
        }
    }
}

/// Errors reported by the token-creation flow.
///
/// All variants leave the form resubmittable; nothing here is fatal to the
/// card-entry session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// `submit` was called while the form was invalid. Never reaches the
    /// network.
    FormInvalid,
    /// I/O-level failure talking to the service; worth a retry affordance.
    Network {
        /// Transport-level description of the failure.
        message: String,
    },
    /// The service answered with a structured error payload.
    Api(ApiError),
    /// The configured background token handler rejected the token; the token
    /// is discarded even though it was created upstream.
    BackgroundHandler {
        /// Message supplied by the handler, passed through verbatim.
        message: String,
    },
}

impl TokenError {
    /// Convenience constructor for transport failures.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormInvalid => write!(f, "card form is not valid"),
            Self::Network { message } => write!(f, "network failure: {}", message),
            Self::Api(api) => write!(f, "API error: {}", api),
            Self::BackgroundHandler { message } => {
                write!(f, "token handler failed: {}", message)
            }
        }
    }
}

impl std::error::Error for TokenError {}

/// Turns a [`TokenError`] into the single user-facing string the UI shows.
///
/// The host supplies its own implementation for localization; the core only
/// guarantees the categorization.
pub trait ErrorTranslator: Send + Sync {
    /// The message to present for `error`.
    fn translate(&self, error: &TokenError) -> String;
}

/// English fallback translation.
///
/// Card-declined messages come from the payload (the processor already
/// phrases those for cardholders); rate-limit and server errors get fixed
/// text; authorization/application errors get fixed text with the raw error
/// code appended for support.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorTranslator;

impl ErrorTranslator for DefaultErrorTranslator {
    fn translate(&self, error: &TokenError) -> String {
        match error {
            TokenError::FormInvalid => "Please check the card details.".to_owned(),
            TokenError::Network { .. } => {
                "A network error occurred. Please check your connection and try again.".to_owned()
            }
            TokenError::Api(api) => match api.kind {
                ApiErrorKind::InvalidCard => api.message.clone(),
                ApiErrorKind::RateLimited => {
                    "Requests are temporarily limited. Please wait a moment and try again."
                        .to_owned()
                }
                ApiErrorKind::Authorization | ApiErrorKind::Application => {
                    let code = api.code.as_deref().unwrap_or("unknown");
                    format!("The request could not be processed. (code: {})", code)
                }
                ApiErrorKind::Server => {
                    "A server error occurred. Please try again later.".to_owned()
                }
            },
            TokenError::BackgroundHandler { message } => message.clone(),
        }
    }
}
