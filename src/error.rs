//! ImageRouter error types

use serde_json::Value;
use thiserror::Error;

/// All possible errors from the ImageRouter client
#[derive(Error, Debug)]
pub enum ImageRouterError {
    /// Invalid or missing API key
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        status: Option<u16>,
        body: Option<Value>,
    },

    /// Rate limit still in effect after the retry budget was spent
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        status: Option<u16>,
        body: Option<Value>,
    },

    /// Account balance too low for the requested operation
    #[error("Insufficient credits: {message}")]
    InsufficientCredits {
        message: String,
        status: Option<u16>,
        body: Option<Value>,
    },

    /// Requested model does not exist or is not accessible
    #[error("Model not found: {message}")]
    ModelNotFound {
        message: String,
        status: Option<u16>,
        body: Option<Value>,
    },

    /// Invalid request parameters, either rejected locally or by the API (400)
    #[error("Invalid request: {message}")]
    Validation {
        message: String,
        status: Option<u16>,
        body: Option<Value>,
    },

    /// Generation accepted but failed on the provider side (5xx)
    #[error("Generation failed: {message}")]
    Generation {
        message: String,
        status: Option<u16>,
        body: Option<Value>,
    },

    /// Connection failures, timeouts and other transport problems
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Any other API error
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
        body: Option<Value>,
    },

    /// Local file system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ImageRouterError {
    /// A locally raised validation error without HTTP context.
    pub fn validation(message: impl Into<String>) -> Self {
        ImageRouterError::Validation {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// A locally raised model-not-found error without HTTP context.
    pub fn model_not_found(message: impl Into<String>) -> Self {
        ImageRouterError::ModelNotFound {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    pub(crate) fn network(message: impl Into<String>, source: Option<reqwest::Error>) -> Self {
        ImageRouterError::Network {
            message: message.into(),
            source,
        }
    }

    /// Human readable message, without the variant prefix used by `Display`
    pub fn message(&self) -> String {
        match self {
            ImageRouterError::Authentication { message, .. }
            | ImageRouterError::RateLimit { message, .. }
            | ImageRouterError::InsufficientCredits { message, .. }
            | ImageRouterError::ModelNotFound { message, .. }
            | ImageRouterError::Validation { message, .. }
            | ImageRouterError::Generation { message, .. }
            | ImageRouterError::Network { message, .. }
            | ImageRouterError::Api { message, .. } => message.clone(),
            ImageRouterError::Io(e) => e.to_string(),
            ImageRouterError::Json(e) => e.to_string(),
        }
    }

    /// HTTP status code of the response that produced this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ImageRouterError::Authentication { status, .. }
            | ImageRouterError::RateLimit { status, .. }
            | ImageRouterError::InsufficientCredits { status, .. }
            | ImageRouterError::ModelNotFound { status, .. }
            | ImageRouterError::Validation { status, .. }
            | ImageRouterError::Generation { status, .. }
            | ImageRouterError::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Raw response payload, if the error came from the API
    pub fn response_body(&self) -> Option<&Value> {
        match self {
            ImageRouterError::Authentication { body, .. }
            | ImageRouterError::RateLimit { body, .. }
            | ImageRouterError::InsufficientCredits { body, .. }
            | ImageRouterError::ModelNotFound { body, .. }
            | ImageRouterError::Validation { body, .. }
            | ImageRouterError::Generation { body, .. }
            | ImageRouterError::Api { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Returns true if repeating the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ImageRouterError::Network { .. }
                | ImageRouterError::RateLimit { .. }
                | ImageRouterError::Generation { .. }
        )
    }
}

/// Classify a non-success HTTP response into a typed error.
///
/// Rules are evaluated in order and the first match wins:
/// 401, 429, 400, 404 (split on whether the message mentions a model),
/// 402 or any message mentioning credits, 5xx, and finally the catch-all.
///
/// The message comes from `error.message` in a JSON body and falls back to
/// the raw text. A body that is not JSON is kept as `{"error": {"message": text}}`.
pub fn classify_response(status: u16, text: &str) -> ImageRouterError {
    let body = serde_json::from_str::<Value>(text)
        .unwrap_or_else(|_| serde_json::json!({ "error": { "message": text } }));

    let message = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| text.to_string());

    let lowered = message.to_lowercase();
    let status_field = Some(status);
    let body = Some(body);

    match status {
        401 => ImageRouterError::Authentication {
            message,
            status: status_field,
            body,
        },
        429 => ImageRouterError::RateLimit {
            message,
            status: status_field,
            body,
        },
        400 => ImageRouterError::Validation {
            message,
            status: status_field,
            body,
        },
        404 if lowered.contains("model") => ImageRouterError::ModelNotFound {
            message,
            status: status_field,
            body,
        },
        404 => ImageRouterError::Api {
            message,
            status: status_field,
            body,
        },
        _ if status == 402 || lowered.contains("credit") => ImageRouterError::InsufficientCredits {
            message,
            status: status_field,
            body,
        },
        500..=599 => ImageRouterError::Generation {
            message,
            status: status_field,
            body,
        },
        _ => ImageRouterError::Api {
            message,
            status: status_field,
            body,
        },
    }
}

/// Result type for ImageRouter operations
pub type Result<T> = std::result::Result<T, ImageRouterError>;
