//! Typed failures surfaced by the hosting layer.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced while talking to the hosting service.
///
/// `context` strings name the operation and repository, for example
/// `fetching pull requests for 'octo/demo'`. No variant ever carries the
/// credential.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostingError {
    /// The caller supplied an unusable argument
    #[error("{message}")]
    InvalidArgument { message: String },

    /// The process is missing required configuration
    #[error("{message}")]
    Configuration { message: String },

    /// The repository or resource does not exist
    #[error("not found while {context}")]
    NotFound { context: String },

    /// The credential was rejected
    #[error("credential rejected (HTTP {status}) while {context}")]
    Auth { context: String, status: u16 },

    /// API quota is exhausted and the wait budget does not cover the reset
    #[error("rate limit exhausted while {context}; quota resets at {}", .reset_at.to_rfc3339())]
    RateLimited { context: String, reset_at: DateTime<Utc> },

    /// Any other non-successful HTTP status
    #[error("hosting service returned HTTP {status} while {context}")]
    Upstream { context: String, status: u16 },

    /// The request never produced a response (connection failure, timeout)
    #[error("request failed while {context}: {message}")]
    Transport { context: String, message: String },

    /// The response body did not have the expected shape
    #[error("unexpected response payload while {context}: {message}")]
    MalformedPayload { context: String, message: String },
}

impl HostingError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Name the operation an argument or configuration error was raised for.
    ///
    /// The other variants are created with their context and are returned unchanged.
    #[must_use]
    pub fn within(self, context: &str) -> Self {
        match self {
            Self::InvalidArgument { message } => Self::InvalidArgument {
                message: format!("{message} while {context}"),
            },
            Self::Configuration { message } => Self::Configuration {
                message: format!("{message} while {context}"),
            },
            other => other,
        }
    }

    /// Stable machine-readable name of the error class.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Configuration { .. } => "configuration",
            Self::NotFound { .. } => "not_found",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limited",
            Self::Upstream { .. } => "upstream",
            Self::Transport { .. } => "transport",
            Self::MalformedPayload { .. } => "malformed_payload",
        }
    }

    /// Whether this error describes the repository or the credential as a whole,
    /// rather than one category of data.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::Configuration { .. } | Self::NotFound { .. } | Self::Auth { .. }
        )
    }

    #[must_use]
    pub const fn reset_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::RateLimited { reset_at, .. } => Some(*reset_at),
            _ => None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
