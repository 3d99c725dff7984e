//! Routing port: the abstract route-computation service.

use std::future::Future;

use thiserror::Error;

use crate::route::{Route, RouteOptions};

/// Errors a [`Router`] can report.
///
/// Cancellation is deliberately a distinct variant: callers must be able to
/// tell "superseded by a newer request" apart from "the service failed".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    /// The request was cancelled before a response arrived.
    #[error("route request canceled")]
    Canceled,

    /// The routing service failed to produce routes.
    #[error("route request failed: {0}")]
    Failed(String),
}

/// Abstract route-computation service.
///
/// Implementations wrap a directions HTTP client, an on-device router, or a
/// test double. A router owns at most one outstanding request per session;
/// [`cancel`](Router::cancel) aborts it, resolving the pending
/// [`get_route`](Router::get_route) call with [`RouterError::Canceled`].
pub trait Router: Send + Sync {
    /// Compute routes for the given options.
    fn get_route(
        &self,
        options: &RouteOptions,
    ) -> impl Future<Output = Result<Vec<Route>, RouterError>> + Send;

    /// Cancel any in-flight request. Must be idempotent.
    fn cancel(&self);
}
