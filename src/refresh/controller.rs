//! Background controller keeping the active route's annotations fresh.
//!
//! [`RouteRefreshController`] owns one [`PeriodicTimer`] job. Every cycle it
//! rebuilds a [`RouteRefreshRequest`] from live state - the current access
//! token, the trip's active route and its server-issued request id, and the
//! current leg index - then calls the [`RouteRefreshClient`] and publishes
//! successful results to the subscriber callback.
//!
//! A missing token, missing active route or missing request id are not
//! errors: the cycle is skipped with a distinct log line and the loop keeps
//! running. The same holds for endpoint failures - only [`stop`]
//! (or dropping the runtime) ends the loop.
//!
//! [`stop`]: RouteRefreshController::stop

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::route::Route;
use crate::timer::{PeriodicTimer, TimerHandle};
use crate::trip::TripProgress;

use super::client::{RefreshEndpoint, RouteRefreshClient, RouteRefreshRequest};

/// Default delay between refresh cycles.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// A successfully refreshed route, paired with the route it was derived from
/// so the consumer can check identity before applying it.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRefresh {
    pub original: Route,
    pub refreshed: Route,
}

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct RouteRefreshConfig {
    /// Delay between refresh cycles.
    pub interval: Duration,
    /// Access token presented to the refresh endpoint. May be set later via
    /// [`RouteRefreshController::set_access_token`]; cycles run with a blank
    /// token are skipped.
    pub access_token: String,
}

impl Default for RouteRefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            access_token: String::new(),
        }
    }
}

/// Why a refresh cycle was skipped without calling the endpoint.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SkipReason {
    #[error("access token is not set")]
    MissingAccessToken,
    #[error("no active route to refresh")]
    NoActiveRoute,
    /// The active route carries no server-issued request id: it was never
    /// accepted by the server as trackable and cannot be refreshed.
    #[error("active route has no refresh request id")]
    MissingRequestUuid,
}

/// Periodic route refresh daemon.
///
/// Cycles run strictly sequentially: the next sleep only begins after the
/// previous cycle - skip, failure or success - has fully completed, so one
/// controller never has overlapping refresh calls in flight.
pub struct RouteRefreshController<P, E> {
    trip: Arc<P>,
    client: Arc<RouteRefreshClient<E>>,
    timer: PeriodicTimer,
    access_token: Arc<Mutex<String>>,
    job: Mutex<Option<TimerHandle>>,
    in_flight: Mutex<CancellationToken>,
}

impl<P, E> RouteRefreshController<P, E>
where
    P: TripProgress + 'static,
    E: RefreshEndpoint + 'static,
{
    /// Controller with the default config (30 s interval, token unset).
    pub fn new(trip: Arc<P>, client: RouteRefreshClient<E>) -> Self {
        Self::with_config(trip, client, RouteRefreshConfig::default())
    }

    pub fn with_config(
        trip: Arc<P>,
        client: RouteRefreshClient<E>,
        config: RouteRefreshConfig,
    ) -> Self {
        Self {
            trip,
            client: Arc::new(client),
            timer: PeriodicTimer::with_interval(config.interval),
            access_token: Arc::new(Mutex::new(config.access_token)),
            job: Mutex::new(None),
            in_flight: Mutex::new(CancellationToken::new()),
        }
    }

    /// Replace the access token used by subsequent cycles.
    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.lock().unwrap() = token.into();
    }

    /// Change the poll interval. Read fresh at the start of every cycle, so
    /// the change takes effect on the next sleep, not the current one.
    pub fn set_interval(&self, interval: Duration) {
        self.timer.set_interval(interval);
    }

    pub fn interval(&self) -> Duration {
        self.timer.interval()
    }

    /// Start the refresh loop, replacing any previous one.
    ///
    /// `on_refreshed` is invoked with every successfully refreshed route; the
    /// consumer owns applying it (e.g. via
    /// `DirectionsSession::apply_refreshed_route`).
    pub fn start<F>(&self, on_refreshed: F)
    where
        F: Fn(RouteRefresh) + Send + Sync + 'static,
    {
        self.stop();

        let cancel = CancellationToken::new();
        *self.in_flight.lock().unwrap() = cancel.clone();

        info!(
            interval_secs = self.timer.interval().as_secs(),
            "Route refresh controller started"
        );

        let trip = Arc::clone(&self.trip);
        let client = Arc::clone(&self.client);
        let access_token = Arc::clone(&self.access_token);
        let on_refreshed = Arc::new(on_refreshed);

        let handle = self.timer.start(move || {
            let trip = Arc::clone(&trip);
            let client = Arc::clone(&client);
            let access_token = Arc::clone(&access_token);
            let on_refreshed = Arc::clone(&on_refreshed);
            let cancel = cancel.clone();
            async move {
                run_cycle(&*trip, &*client, &*access_token, &cancel, &*on_refreshed).await;
            }
        });

        *self.job.lock().unwrap() = Some(handle);
    }

    /// Cancel the loop and any in-flight refresh call. Safe to call multiple
    /// times and from any state.
    pub fn stop(&self) {
        if let Some(job) = self.job.lock().unwrap().take() {
            debug!("Route refresh controller stopping");
            job.cancel();
        }
        self.in_flight.lock().unwrap().cancel();
    }

    pub fn is_running(&self) -> bool {
        self.job
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|job| !job.is_cancelled())
    }
}

impl<P, E> Drop for RouteRefreshController<P, E> {
    fn drop(&mut self) {
        if let Some(job) = self.job.lock().unwrap().take() {
            job.cancel();
        }
        self.in_flight.lock().unwrap().cancel();
    }
}

/// One refresh cycle: build the request from live state, call the endpoint,
/// publish on success. Never propagates errors - the loop must outlive any
/// single failed cycle.
async fn run_cycle<P, E, F>(
    trip: &P,
    client: &RouteRefreshClient<E>,
    access_token: &Mutex<String>,
    cancel: &CancellationToken,
    on_refreshed: &F,
) where
    P: TripProgress,
    E: RefreshEndpoint,
    F: Fn(RouteRefresh),
{
    let token = access_token.lock().unwrap().clone();
    let request = match build_request(trip, token) {
        Ok(request) => request,
        Err(reason) => {
            debug!(reason = %reason, "Skipping route refresh cycle");
            return;
        }
    };

    let result = tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            debug!("Route refresh canceled while in flight");
            return;
        }

        result = client.refresh(&request) => result,
    };

    match result {
        Ok(refreshed) => {
            debug!(
                request_uuid = %request.request_uuid,
                leg_index = request.leg_index,
                "Route refreshed"
            );
            on_refreshed(RouteRefresh {
                original: request.original_route,
                refreshed,
            });
        }
        Err(error) => {
            warn!(error = %error, "Route refresh failed; retrying next cycle");
        }
    }
}

/// Assemble a refresh request from live state, or name the precondition that
/// is missing.
fn build_request<P: TripProgress>(
    trip: &P,
    access_token: String,
) -> Result<RouteRefreshRequest, SkipReason> {
    if access_token.is_empty() {
        return Err(SkipReason::MissingAccessToken);
    }
    let route = trip.route().ok_or(SkipReason::NoActiveRoute)?;
    let request_uuid = route
        .request_uuid
        .clone()
        .filter(|uuid| !uuid.is_empty())
        .ok_or(SkipReason::MissingRequestUuid)?;
    let leg_index = trip.current_leg_index().unwrap_or(0);

    Ok(RouteRefreshRequest {
        access_token,
        original_route: route,
        request_uuid,
        leg_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::client::{AnnotatedLeg, AnnotatedRoute, RefreshResponse};
    use crate::refresh::error::RefreshError;
    use crate::route::{Congestion, Coordinate, LegAnnotation, Route, RouteLeg, RouteOptions};

    #[derive(Default)]
    struct MockTrip {
        route: Mutex<Option<Route>>,
        leg_index: Mutex<Option<usize>>,
    }

    impl TripProgress for MockTrip {
        fn route(&self) -> Option<Route> {
            self.route.lock().unwrap().clone()
        }

        fn current_leg_index(&self) -> Option<usize> {
            *self.leg_index.lock().unwrap()
        }
    }

    /// Endpoint recording every call, answering from a fixed response.
    struct MockEndpoint {
        calls: Arc<Mutex<Vec<(String, String, usize, Option<u32>)>>>,
        response: Result<RefreshResponse, RefreshError>,
    }

    impl RefreshEndpoint for MockEndpoint {
        async fn fetch_refresh(
            &self,
            access_token: &str,
            request_uuid: &str,
            leg_index: usize,
            route_index: Option<u32>,
        ) -> Result<RefreshResponse, RefreshError> {
            self.calls.lock().unwrap().push((
                access_token.to_string(),
                request_uuid.to_string(),
                leg_index,
                route_index,
            ));
            self.response.clone()
        }
    }

    fn trackable_route() -> Route {
        Route::new(
            vec![RouteLeg::default()],
            RouteOptions::new(vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)]),
        )
        .with_request_uuid("test_id")
    }

    fn annotated_response() -> RefreshResponse {
        RefreshResponse {
            route: Some(AnnotatedRoute {
                legs: vec![AnnotatedLeg {
                    annotation: Some(LegAnnotation {
                        congestion: vec![Congestion::Heavy],
                        ..Default::default()
                    }),
                }],
            }),
        }
    }

    struct Harness {
        controller: RouteRefreshController<MockTrip, MockEndpoint>,
        trip: Arc<MockTrip>,
        calls: Arc<Mutex<Vec<(String, String, usize, Option<u32>)>>>,
        refreshes: Arc<Mutex<Vec<RouteRefresh>>>,
    }

    fn harness_with(
        response: Result<RefreshResponse, RefreshError>,
        interval: Duration,
        access_token: &str,
    ) -> Harness {
        let trip = Arc::new(MockTrip::default());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let endpoint = MockEndpoint {
            calls: Arc::clone(&calls),
            response,
        };
        let controller = RouteRefreshController::with_config(
            Arc::clone(&trip),
            RouteRefreshClient::new(endpoint),
            RouteRefreshConfig {
                interval,
                access_token: access_token.to_string(),
            },
        );
        Harness {
            controller,
            trip,
            calls,
            refreshes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn start_collecting(harness: &Harness) {
        let refreshes = Arc::clone(&harness.refreshes);
        harness.controller.start(move |refresh| {
            refreshes.lock().unwrap().push(refresh);
        });
    }

    #[tokio::test(start_paused = true)]
    async fn requires_an_access_token() {
        let harness = harness_with(Ok(annotated_response()), Duration::from_secs(5), "");
        *harness.trip.route.lock().unwrap() = Some(trackable_route());
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_secs(10)).await;
        harness.controller.stop();

        assert!(harness.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_over_interval() {
        let harness =
            harness_with(Ok(annotated_response()), Duration::from_secs(5), "token");
        *harness.trip.route.lock().unwrap() = Some(trackable_route());
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_secs(10)).await;
        harness.controller.stop();

        assert_eq!(harness.calls.lock().unwrap().len(), 2);
        assert_eq!(harness.refreshes.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_endpoint_with_request_parameters() {
        let harness =
            harness_with(Ok(annotated_response()), Duration::from_secs(5), "test_access_token");
        *harness.trip.route.lock().unwrap() = Some(trackable_route());
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_secs(6)).await;
        harness.controller.stop();

        let calls = harness.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            (
                "test_access_token".to_string(),
                "test_id".to_string(),
                0,
                None
            )
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reads_leg_index_from_trip_progress() {
        let harness =
            harness_with(Ok(annotated_response()), Duration::from_secs(5), "token");
        *harness.trip.route.lock().unwrap() = Some(trackable_route());
        *harness.trip.leg_index.lock().unwrap() = Some(1);
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_secs(6)).await;
        harness.controller.stop();

        assert_eq!(harness.calls.lock().unwrap()[0].2, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn skips_without_active_route() {
        let harness =
            harness_with(Ok(annotated_response()), Duration::from_secs(5), "token");
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_secs(10)).await;
        harness.controller.stop();

        assert!(harness.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn skips_route_without_request_uuid() {
        let harness =
            harness_with(Ok(annotated_response()), Duration::from_secs(5), "token");
        let mut route = trackable_route();
        route.request_uuid = None;
        *harness.trip.route.lock().unwrap() = Some(route);
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_secs(10)).await;
        harness.controller.stop();

        assert!(harness.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_takes_effect_on_next_sleep() {
        let harness =
            harness_with(Ok(annotated_response()), Duration::from_secs(1), "token");
        *harness.trip.route.lock().unwrap() = Some(trackable_route());
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        harness.controller.set_interval(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_millis(20100)).await;
        harness.controller.stop();

        assert_eq!(harness.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn survives_endpoint_failures() {
        let harness = harness_with(
            Err(RefreshError::Endpoint("boom".into())),
            Duration::from_secs(5),
            "token",
        );
        *harness.trip.route.lock().unwrap() = Some(trackable_route());
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_secs(16)).await;
        harness.controller.stop();

        // The loop kept polling despite every call failing
        assert_eq!(harness.calls.lock().unwrap().len(), 3);
        assert!(harness.refreshes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_original_and_refreshed_pair() {
        let harness =
            harness_with(Ok(annotated_response()), Duration::from_secs(5), "token");
        let route = trackable_route();
        *harness.trip.route.lock().unwrap() = Some(route.clone());
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_secs(6)).await;
        harness.controller.stop();

        let refreshes = harness.refreshes.lock().unwrap();
        assert_eq!(refreshes[0].original, route);
        assert_eq!(
            refreshes[0].refreshed.legs[0]
                .annotation
                .as_ref()
                .unwrap()
                .congestion,
            vec![Congestion::Heavy]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_polling_and_is_idempotent() {
        let harness =
            harness_with(Ok(annotated_response()), Duration::from_secs(5), "token");
        *harness.trip.route.lock().unwrap() = Some(trackable_route());
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_secs(6)).await;
        harness.controller.stop();
        harness.controller.stop();
        assert!(!harness.controller.is_running());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(harness.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_loop() {
        let harness =
            harness_with(Ok(annotated_response()), Duration::from_secs(5), "token");
        *harness.trip.route.lock().unwrap() = Some(trackable_route());
        start_collecting(&harness);
        start_collecting(&harness);

        tokio::time::sleep(Duration::from_secs(6)).await;
        harness.controller.stop();

        // Only one loop polling: a single call per interval
        assert_eq!(harness.calls.lock().unwrap().len(), 1);
    }
}
