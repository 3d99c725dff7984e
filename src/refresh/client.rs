//! Refresh endpoint port and the annotation merge algorithm.
//!
//! [`RouteRefreshClient`] is a stateless request/response mapper: it calls the
//! [`RefreshEndpoint`] port with the correlation parameters and maps the
//! partial, leg-indexed annotation response back onto the original route,
//! producing a new immutable [`Route`]. Response entries are indexed relative
//! to the requested leg index: entry 0 corresponds to original leg
//! `leg_index`, and legs before `leg_index` are left exactly as they were.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::route::{LegAnnotation, Route};

use super::error::RefreshError;
use super::transform::{CongestionTransform, PassThroughTransform};

/// One refresh call's parameters. Created fresh each poll cycle and discarded
/// after the call completes.
#[derive(Debug, Clone)]
pub struct RouteRefreshRequest {
    pub access_token: String,
    /// The route whose annotations are being refreshed.
    pub original_route: Route,
    /// Server-issued id correlating this call with the original computation.
    pub request_uuid: String,
    /// Leg currently being traversed; the server only returns data for legs
    /// at this index and beyond.
    pub leg_index: usize,
}

/// A refreshed leg as returned by the endpoint: annotation data only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotatedLeg {
    #[serde(default)]
    pub annotation: Option<LegAnnotation>,
}

/// The partial route carried by a refresh response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotatedRoute {
    #[serde(default)]
    pub legs: Vec<AnnotatedLeg>,
}

/// Raw refresh endpoint response. `route` may legitimately be absent on a
/// malformed or empty server reply; the client turns that into
/// [`RefreshError::MalformedResponse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub route: Option<AnnotatedRoute>,
}

/// Abstract route refresh service.
///
/// Implementations wrap the directions-refresh HTTP API or a test double.
pub trait RefreshEndpoint: Send + Sync {
    fn fetch_refresh(
        &self,
        access_token: &str,
        request_uuid: &str,
        leg_index: usize,
        route_index: Option<u32>,
    ) -> impl Future<Output = Result<RefreshResponse, RefreshError>> + Send;
}

/// Stateless mapper from refresh requests to refreshed routes.
pub struct RouteRefreshClient<E> {
    endpoint: E,
    transform: Box<dyn CongestionTransform>,
}

impl<E: RefreshEndpoint> RouteRefreshClient<E> {
    /// Client with the default pass-through congestion policy.
    pub fn new(endpoint: E) -> Self {
        Self::with_transform(endpoint, Box::new(PassThroughTransform))
    }

    /// Client with a custom congestion remapping step.
    pub fn with_transform(endpoint: E, transform: Box<dyn CongestionTransform>) -> Self {
        Self {
            endpoint,
            transform,
        }
    }

    /// Fetch fresh annotations for the request's remaining legs and merge them
    /// into the original route, yielding a new route value.
    pub async fn refresh(&self, request: &RouteRefreshRequest) -> Result<Route, RefreshError> {
        let response = self
            .endpoint
            .fetch_refresh(
                &request.access_token,
                &request.request_uuid,
                request.leg_index,
                request.original_route.route_index,
            )
            .await?;

        let annotated = response.route.ok_or(RefreshError::MalformedResponse)?;

        debug!(
            request_uuid = %request.request_uuid,
            leg_index = request.leg_index,
            refreshed_legs = annotated.legs.len(),
            "Merging refreshed annotations"
        );

        Ok(self.merge(&request.original_route, request.leg_index, &annotated))
    }

    /// Replace annotations from `leg_index` onward with the response entries.
    ///
    /// Response legs are indexed relative to `leg_index`. A response covering
    /// fewer legs than remain updates the legs it covers and leaves the rest
    /// untouched. Geometry, options and leg count are never altered.
    fn merge(&self, original: &Route, leg_index: usize, annotated: &AnnotatedRoute) -> Route {
        let mut refreshed = original.clone();
        for position in leg_index..refreshed.legs.len() {
            let Some(fresh) = annotated.legs.get(position - leg_index) else {
                continue;
            };
            refreshed.legs[position].annotation = fresh.annotation.as_ref().map(|annotation| {
                let mut annotation = annotation.clone();
                annotation.congestion = self.transform.transform(&annotation.congestion);
                annotation
            });
        }
        refreshed
    }
}
