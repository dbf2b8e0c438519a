//! Error taxonomy for the TradeStation client.
//!
//! | Variant | Raised by | I/O attempted |
//! |---------|-----------|---------------|
//! | `InvalidArgument` | argument validation (bar windows, order prices) | no |
//! | `RangeTooLarge` | historical intraday capacity check | no |
//! | `Authentication` | OAuth refresh-token exchange | yes |
//! | `Http` | any non-success response | yes |
//! | `Network` | transport failures, undecodable bodies | yes |
//! | `DataFormat` | bar / envelope parsing | yes |
//! | `Cancelled` | client or stream cancellation token | partially |

use thiserror::Error;

/// Errors returned by client operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Invalid argument combination; rejected before any request.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Refresh-token exchange failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// API returned a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, or the raw body.
        message: String,
    },

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Response did not have the expected shape.
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Requested history exceeds what the provider can serve in one request.
    #[error("Date range too large: {required} bars required, limit is {limit}")]
    RangeTooLarge {
        /// Bars needed to cover the requested range.
        required: u64,
        /// Provider ceiling.
        limit: u64,
    },

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,
}

impl ClientError {
    /// Shorthand for a `DataFormat` error.
    pub(crate) fn data_format(message: impl Into<String>) -> Self {
        Self::DataFormat(message.into())
    }

    /// Shorthand for an `InvalidArgument` error.
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns true if the error was raised before any network I/O.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::RangeTooLarge { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::DataFormat(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
