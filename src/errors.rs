use std::fmt;

/// Application-specific error types.
///
/// Every user-triggered operation resolves to one of these; nothing here is
/// fatal to the process. The worst case is forced re-authentication.
#[derive(Debug, Clone)]
pub enum AppError {
    /// The API answered 401. The session token has been discarded and the
    /// caller must stop updating the UI.
    SessionExpired,
    /// A request failed with a non-2xx status, or the transport failed before
    /// any HTTP status existed (`status == 0`), or a success body violated the
    /// JSON protocol.
    RequestFailed {
        /// HTTP status code, 0 when the failure preceded a response.
        status: u16,
        /// Server-supplied message, or the transport status text.
        message: String,
    },
    /// Client-side validation rejected the input before any network call.
    ValidationFailed(String),
    /// The session token could not be decoded; treated as an absent session.
    DecodeFailed(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::SessionExpired => write!(f, "Session expired"),
            AppError::RequestFailed { status, message } => {
                if *status == 0 {
                    write!(f, "Request failed: {}", message)
                } else {
                    write!(f, "Request failed ({}): {}", status, message)
                }
            }
            AppError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            AppError::DecodeFailed(msg) => write!(f, "Invalid session token: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl AppError {
    /// The underlying error at the bottom of a context chain.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    ///
    /// A status-carrying error keeps its status; anything earlier in the
    /// transport (connect, timeout, body read) reports status 0.
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
        AppError::RequestFailed {
            status,
            message: err.to_string(),
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
