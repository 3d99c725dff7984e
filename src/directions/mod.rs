//! Directions session and its routing port.
//!
//! - [`DirectionsSession`] - Owner of the active route set and the single
//!   in-flight route request
//! - [`Router`] - Abstract route-computation service
//! - [`RoutesObserver`] - Synchronous route-set change notifications

mod router;
mod session;

pub use router::{Router, RouterError};
pub use session::{
    DirectionsSession, RoutesObserver, RoutesRequestOutcome, DEFAULT_REROUTE_BEARING_TOLERANCE,
};
