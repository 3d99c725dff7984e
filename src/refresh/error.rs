//! Error types for route refresh.

use thiserror::Error;

/// Errors that can occur while refreshing a route's annotations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// The refresh endpoint failed (network or service error).
    #[error("refresh request failed: {0}")]
    Endpoint(String),

    /// The endpoint answered, but the response carried no route annotation
    /// payload to merge.
    #[error("refresh response contained no route annotations")]
    MalformedResponse,
}
