//! Directions session - owner of the active route set.
//!
//! [`DirectionsSession`] is the single writer for the session's current route
//! set. It delegates route computation to the [`Router`] port, cancels any
//! in-flight request when the set is replaced, and fans change notifications
//! out to registered [`RoutesObserver`]s synchronously, in registration order.
//!
//! The route set is serialized behind one mutex (single-writer discipline);
//! the router port is awaited outside the lock, and observers are notified
//! after the lock is released so a re-entrant observer cannot deadlock the
//! session.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, warn};

use crate::route::{Bearing, Coordinate, Route, RouteOptions};
use crate::trip::{RouteProgress, VehicleLocation};

use super::router::{Router, RouterError};

/// Bearing tolerance applied to the reroute origin when the original options
/// did not constrain the origin bearing.
pub const DEFAULT_REROUTE_BEARING_TOLERANCE: f64 = 90.0;

/// Callback interested in route-set changes.
///
/// Observers are invoked synchronously on the thread mutating the route set.
/// The routes slice is immutable shared state; implementations must not block
/// for long.
pub trait RoutesObserver: Send + Sync {
    fn on_routes_changed(&self, routes: &[Route]);
}

/// Outcome of a route request issued through the session.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutesRequestOutcome {
    /// The routing port produced routes.
    Ready(Vec<Route>),
    /// The routing port failed; `options` are the options the caller should
    /// associate with the failure.
    Failure {
        error: RouterError,
        options: RouteOptions,
    },
    /// The request was cancelled (typically superseded by a newer one).
    Canceled { options: RouteOptions },
}

struct SessionState {
    routes: Vec<Route>,
    route_options: Option<RouteOptions>,
    observers: Vec<Arc<dyn RoutesObserver>>,
}

/// Owner of the authoritative current route set.
///
/// At most one primary route request is outstanding at a time: replacing the
/// route set (directly or via a new request) cancels the previous request
/// through the router port before the field is touched.
pub struct DirectionsSession<R> {
    router: R,
    state: Mutex<SessionState>,
}

impl<R: Router> DirectionsSession<R> {
    pub fn new(router: R) -> Self {
        Self {
            router,
            state: Mutex::new(SessionState {
                routes: Vec::new(),
                route_options: None,
                observers: Vec::new(),
            }),
        }
    }

    /// Snapshot of the current route set. Empty means "no active route".
    pub fn routes(&self) -> Vec<Route> {
        self.state.lock().unwrap().routes.clone()
    }

    /// The options of the most recently adopted primary route.
    pub fn current_route_options(&self) -> Option<RouteOptions> {
        self.state.lock().unwrap().route_options.clone()
    }

    /// Replace the current route set.
    ///
    /// Cancels any in-flight router request first, then swaps the field,
    /// records the first route's options as the session's current options
    /// (when non-empty) and notifies every observer with the new set.
    /// Setting an empty set onto an already-empty set is a no-op.
    pub fn set_routes(&self, routes: Vec<Route>) {
        // Cancellation must precede the field replacement
        self.router.cancel();

        let (snapshot, observers) = {
            let mut state = self.state.lock().unwrap();
            if state.routes.is_empty() && routes.is_empty() {
                return;
            }
            state.routes = routes;
            if let Some(primary) = state.routes.first() {
                state.route_options = Some(primary.route_options.clone());
            }
            (state.routes.clone(), state.observers.clone())
        };

        debug!(routes = snapshot.len(), "Route set replaced");
        notify_all(&observers, &snapshot);
    }

    /// Request routes from the routing port and adopt the result.
    ///
    /// The current route set is cleared first, so observers see the empty
    /// transition before the request goes out. On success the response becomes
    /// the new route set (notifying observers) and is also returned; on
    /// failure or cancellation the set stays empty and the outcome carries the
    /// requested options.
    pub async fn request_routes(&self, options: RouteOptions) -> RoutesRequestOutcome {
        self.set_routes(Vec::new());

        match self.router.get_route(&options).await {
            Ok(routes) => {
                self.set_routes(routes.clone());
                RoutesRequestOutcome::Ready(routes)
            }
            Err(RouterError::Canceled) => {
                debug!("Route request canceled");
                RoutesRequestOutcome::Canceled { options }
            }
            Err(error) => {
                warn!(error = %error, "Route request failed");
                RoutesRequestOutcome::Failure { error, options }
            }
        }
    }

    /// Speculative fetch of a faster route for the current trip.
    ///
    /// Never mutates the session's own route set; the caller decides whether
    /// to adopt the result via [`set_routes`](Self::set_routes). With no
    /// active route the request is answered as cancelled without touching the
    /// network. Failure and cancellation report the session's last-known
    /// current options rather than the adjusted ones, which may not represent
    /// session state.
    pub async fn request_faster_route(
        &self,
        adjusted_options: RouteOptions,
    ) -> RoutesRequestOutcome {
        if self.state.lock().unwrap().routes.is_empty() {
            return RoutesRequestOutcome::Canceled {
                options: adjusted_options,
            };
        }

        match self.router.get_route(&adjusted_options).await {
            Ok(routes) => RoutesRequestOutcome::Ready(routes),
            Err(RouterError::Canceled) => RoutesRequestOutcome::Canceled {
                options: self
                    .current_route_options()
                    .unwrap_or(adjusted_options),
            },
            Err(error) => RoutesRequestOutcome::Failure {
                error,
                options: self
                    .current_route_options()
                    .unwrap_or(adjusted_options),
            },
        }
    }

    /// Build route options that restart routing from the vehicle's current
    /// position for the not-yet-traversed remainder of the route.
    ///
    /// The origin and every waypoint up to and including the current leg are
    /// dropped; the current position becomes the new origin with a bearing of
    /// (heading, tolerance), where the tolerance is taken from the original
    /// origin's bearing when one was specified and
    /// [`DEFAULT_REROUTE_BEARING_TOLERANCE`] otherwise. Remaining bearing
    /// entries reuse the original suffix, padded with `None` up to the new
    /// coordinate count.
    ///
    /// Not yet supported - dropped from the adjusted options: `radiuses`,
    /// `approaches`, `waypoint_indices`, `waypoint_names`, `waypoint_targets`.
    /// Their entries would index coordinates that no longer exist.
    ///
    /// When `progress` carries no leg index the options are returned
    /// unchanged.
    pub fn build_adjusted_route_options(
        &self,
        options: &RouteOptions,
        progress: &RouteProgress,
        location: &VehicleLocation,
    ) -> RouteOptions {
        let Some(leg_index) = progress.current_leg_index else {
            return options.clone();
        };

        let coordinates = &options.coordinates;
        let keep_from = (leg_index + 2).min(coordinates.len());

        let mut new_coordinates = Vec::with_capacity(1 + coordinates.len() - keep_from);
        new_coordinates.push(Coordinate::new(location.longitude, location.latitude));
        new_coordinates.extend_from_slice(&coordinates[keep_from..]);

        let origin_tolerance = options
            .bearings
            .as_ref()
            .and_then(|bearings| bearings.first())
            .and_then(|bearing| *bearing)
            .map(|bearing| bearing.tolerance)
            .unwrap_or(DEFAULT_REROUTE_BEARING_TOLERANCE);

        let mut bearings: Vec<Option<Bearing>> = Vec::with_capacity(new_coordinates.len());
        bearings.push(Some(Bearing::new(location.bearing, origin_tolerance)));
        if let Some(original) = &options.bearings {
            bearings.extend(original.iter().skip(keep_from).cloned());
        }
        while bearings.len() < new_coordinates.len() {
            bearings.push(None);
        }
        bearings.truncate(new_coordinates.len());

        let mut adjusted = options.clone();
        adjusted.coordinates = new_coordinates;
        adjusted.bearings = Some(bearings);
        adjusted.radiuses = None;
        adjusted.approaches = None;
        adjusted.waypoint_indices = None;
        adjusted.waypoint_names = None;
        adjusted.waypoint_targets = None;
        adjusted
    }

    /// Apply a background-refreshed primary route.
    ///
    /// This is the sink for refresh controller output. The refreshed route is
    /// discarded (returning `false`) when the session's primary route identity
    /// no longer matches - the route set changed while the refresh was in
    /// flight, and the last mutation wins. On a match the primary is replaced
    /// through [`set_routes`](Self::set_routes), preserving alternates and the
    /// observer fan-out.
    pub fn apply_refreshed_route(&self, refreshed: Route) -> bool {
        let updated = {
            let state = self.state.lock().unwrap();
            let Some(primary) = state.routes.first() else {
                debug!("Discarding refreshed route: no active route");
                return false;
            };
            if primary.request_uuid.is_none() || primary.request_uuid != refreshed.request_uuid {
                debug!("Discarding refreshed route: primary route changed while refresh was in flight");
                return false;
            }
            let mut routes = state.routes.clone();
            routes[0] = refreshed;
            routes
        };

        self.set_routes(updated);
        true
    }

    /// Register an observer for route-set changes.
    ///
    /// When a non-empty route set is already established it is replayed to the
    /// new observer immediately, exactly once, so late registrants never miss
    /// current state.
    pub fn register_observer(&self, observer: Arc<dyn RoutesObserver>) {
        let replay = {
            let mut state = self.state.lock().unwrap();
            state.observers.push(Arc::clone(&observer));
            if state.routes.is_empty() {
                None
            } else {
                Some(state.routes.clone())
            }
        };

        if let Some(routes) = replay {
            notify_all(std::slice::from_ref(&observer), &routes);
        }
    }

    /// Remove a previously registered observer. Identity is `Arc` pointer
    /// identity.
    pub fn unregister_observer(&self, observer: &Arc<dyn RoutesObserver>) {
        self.state
            .lock()
            .unwrap()
            .observers
            .retain(|existing| !Arc::ptr_eq(existing, observer));
    }

    pub fn unregister_all_observers(&self) {
        self.state.lock().unwrap().observers.clear();
    }

    /// Cancel any in-flight router request. Idempotent.
    pub fn cancel(&self) {
        self.router.cancel();
    }

    /// Terminal shutdown. No further requests should be issued afterwards;
    /// this is a contract with the caller, not an enforced state flag.
    pub fn shutdown(&self) {
        self.cancel();
    }
}

/// Notify observers in order, isolating panics so one faulty observer cannot
/// starve the rest of the fan-out.
fn notify_all(observers: &[Arc<dyn RoutesObserver>], routes: &[Route]) {
    for observer in observers {
        let outcome =
            std::panic::catch_unwind(AssertUnwindSafe(|| observer.on_routes_changed(routes)));
        if outcome.is_err() {
            error!("Routes observer panicked during notification; continuing fan-out");
        }
    }
}
