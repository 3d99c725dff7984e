//! navroute - active-route lifecycle management with periodic refresh.
//!
//! This library owns the client-side lifecycle of a navigation route: the
//! session holding the current route set, and the background machinery that
//! keeps the route's traffic congestion annotations current without touching
//! its geometry or the navigation state in progress.
//!
//! # High-Level Flow
//!
//! ```ignore
//! use std::sync::Arc;
//! use navroute::directions::DirectionsSession;
//! use navroute::refresh::{RouteRefreshClient, RouteRefreshController};
//!
//! let session = Arc::new(DirectionsSession::new(router));
//! session.register_observer(map_observer);
//!
//! // Compute and adopt a route
//! session.request_routes(options).await;
//!
//! // Keep its congestion annotations fresh in the background
//! let controller = RouteRefreshController::new(trip, RouteRefreshClient::new(endpoint));
//! let sink = Arc::clone(&session);
//! controller.start(move |refresh| {
//!     sink.apply_refreshed_route(refresh.refreshed);
//! });
//! ```
//!
//! Route computation itself, turn-by-turn instructions and map-matching are
//! out of scope; the [`directions::Router`], [`refresh::RefreshEndpoint`] and
//! [`trip::TripProgress`] ports abstract those collaborators.

pub mod directions;
pub mod logging;
pub mod refresh;
pub mod route;
pub mod timer;
pub mod trip;

/// Version of the navroute library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
