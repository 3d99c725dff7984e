//! Trip progress port - read-only view of live navigation state.
//!
//! The refresh controller and the session's reroute computation both need to
//! know where the vehicle currently is within the active route. That state is
//! owned elsewhere (a trip session fed by the location provider); this module
//! only defines the query surface:
//!
//! - [`TripProgress`] - Pull API for the active route and current leg index
//! - [`RouteProgress`] - Snapshot of progress along the active route
//! - [`VehicleLocation`] - Current position fix with heading

use crate::route::Route;

/// Read-only access to the currently active trip.
///
/// Implementations are queried fresh at the start of every refresh cycle, so
/// they should return the live view, not a cached one.
pub trait TripProgress: Send + Sync {
    /// The route navigation is currently following, if any.
    fn route(&self) -> Option<Route>;

    /// Zero-based index of the leg currently being traversed.
    ///
    /// `None` when progress is not (yet) available; callers treat that as
    /// leg 0.
    fn current_leg_index(&self) -> Option<usize>;
}

/// Snapshot of progress along the active route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteProgress {
    /// Zero-based index of the leg currently being traversed, when known.
    pub current_leg_index: Option<usize>,
}

impl RouteProgress {
    pub fn at_leg(index: usize) -> Self {
        Self {
            current_leg_index: Some(index),
        }
    }
}

/// A position fix from the on-device location provider.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Heading in degrees clockwise from true north.
    pub bearing: f64,
}

impl VehicleLocation {
    pub fn new(latitude: f64, longitude: f64, bearing: f64) -> Self {
        Self {
            latitude,
            longitude,
            bearing,
        }
    }
}
