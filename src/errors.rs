use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error codes reported by the Stack Exchange API in the `error.code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    InternalServerError,
    InvalidApplicationPublicKey,
    InvalidPageSize,
    InvalidSort,
    InvalidOrder,
    RequestRateExceeded,
    InvalidVectorFormat,
    TooManyIds,
    UnconstrainedSearch,
    InvalidTags,
    /// A code this client does not know about.
    Other(i32),
}

impl ErrorCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            404 => Self::NotFound,
            500 => Self::InternalServerError,
            4000 => Self::InvalidApplicationPublicKey,
            4001 => Self::InvalidPageSize,
            4002 => Self::InvalidSort,
            4003 => Self::InvalidOrder,
            4004 => Self::RequestRateExceeded,
            4005 => Self::InvalidVectorFormat,
            4006 => Self::TooManyIds,
            4007 => Self::UnconstrainedSearch,
            4008 => Self::InvalidTags,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound => 404,
            Self::InternalServerError => 500,
            Self::InvalidApplicationPublicKey => 4000,
            Self::InvalidPageSize => 4001,
            Self::InvalidSort => 4002,
            Self::InvalidOrder => 4003,
            Self::RequestRateExceeded => 4004,
            Self::InvalidVectorFormat => 4005,
            Self::TooManyIds => 4006,
            Self::UnconstrainedSearch => 4007,
            Self::InvalidTags => 4008,
            Self::Other(code) => *code,
        }
    }
}

/// All errors that can occur when using the Stack Exchange client.
#[derive(Error, Debug)]
pub enum StackExchangeError {
    /// The API answered with a non-2xx status.
    #[error("API error {status_code} (code {}): {message}", .error_code.code())]
    Api {
        status_code: u16,
        error_code: ErrorCode,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A search carried neither tags nor title text.
    ///
    /// Raised locally before any request is sent, or mapped from upstream
    /// error code 4007.
    #[error("unconstrained search: {message}")]
    UnconstrainedSearch {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A paging, range, time period, tag or id-list value was rejected, or a
    /// query builder constraint conflicts with one already set.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested resource was not found (HTTP 404 or an empty lookup).
    #[error("not found: {message}")]
    NotFound { message: String },

    /// No API key was available when building the client.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// A transport-level HTTP error from reqwest.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StackExchangeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn unconstrained(message: impl Into<String>) -> Self {
        Self::UnconstrainedSearch {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// HTTP status associated with this error, if any.
    ///
    /// Locally raised unconstrained searches report 400, matching what the
    /// API would have answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => Some(*status_code),
            Self::UnconstrainedSearch { .. } => Some(400),
            Self::NotFound { .. } => Some(404),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Upstream error code, if any.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { error_code, .. } => Some(*error_code),
            Self::UnconstrainedSearch { .. } => Some(ErrorCode::UnconstrainedSearch),
            _ => None,
        }
    }

    /// When the error was observed, for errors that carry a timestamp.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Api { timestamp, .. } | Self::UnconstrainedSearch { timestamp, .. } => {
                Some(*timestamp)
            }
            _ => None,
        }
    }
}

/// A convenience alias for `Result<T, StackExchangeError>`.
pub type Result<T> = std::result::Result<T, StackExchangeError>;
