//! Route request parameters: [`RouteOptions`] and its geographic primitives.

use serde::{Deserialize, Serialize};

/// A geographic position as (longitude, latitude), WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.longitude, self.latitude)
    }
}

/// A departure bearing constraint for one coordinate: travel direction in
/// degrees clockwise from true north, plus the allowed deviation window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bearing {
    /// Direction of travel, degrees clockwise from true north.
    pub angle: f64,
    /// Allowed deviation from `angle`, degrees.
    pub tolerance: f64,
}

impl Bearing {
    pub fn new(angle: f64, tolerance: f64) -> Self {
        Self { angle, tolerance }
    }
}

/// Routing profile the route was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingProfile {
    /// Car routing honoring live traffic.
    #[default]
    DrivingTraffic,
    /// Car routing without live traffic.
    Driving,
    Cycling,
    Walking,
}

impl std::fmt::Display for RoutingProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DrivingTraffic => write!(f, "driving-traffic"),
            Self::Driving => write!(f, "driving"),
            Self::Cycling => write!(f, "cycling"),
            Self::Walking => write!(f, "walking"),
        }
    }
}

/// The full parameter set a route was computed from.
///
/// Carried on every [`Route`](super::Route) so that rerouting can restart from
/// the same constraints. Per-waypoint lists (`bearings`, `radiuses`,
/// `approaches`, `waypoint_*`) run parallel to `coordinates` where present.
///
/// This is a derived value: it is recorded when a route is adopted and is not
/// independently mutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOptions {
    /// Origin, waypoints, destination - in travel order.
    pub coordinates: Vec<Coordinate>,
    #[serde(default)]
    pub profile: RoutingProfile,
    /// Request alternative routes alongside the primary.
    #[serde(default)]
    pub alternatives: bool,
    #[serde(default)]
    pub steps: bool,
    #[serde(default)]
    pub voice_instructions: bool,
    #[serde(default)]
    pub banner_instructions: bool,
    #[serde(default)]
    pub roundabout_exits: bool,
    #[serde(default)]
    pub continue_straight: bool,
    /// Ask the server to issue a refresh-trackable request id.
    #[serde(default)]
    pub enable_refresh: bool,
    /// Road classes to exclude, e.g. "motorway".
    #[serde(default)]
    pub exclude: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Departure bearing per coordinate; `None` entries are unconstrained.
    #[serde(default)]
    pub bearings: Option<Vec<Option<Bearing>>>,
    /// Snapping radius per coordinate, meters.
    #[serde(default)]
    pub radiuses: Option<Vec<Option<f64>>>,
    /// Side-of-road approach per coordinate, e.g. "curb".
    #[serde(default)]
    pub approaches: Option<Vec<Option<String>>>,
    /// Which coordinates are true waypoints (the rest are silent).
    #[serde(default)]
    pub waypoint_indices: Option<Vec<usize>>,
    #[serde(default)]
    pub waypoint_names: Option<Vec<String>>,
    /// Exact arrival target per waypoint.
    #[serde(default)]
    pub waypoint_targets: Option<Vec<Option<Coordinate>>>,
}

impl RouteOptions {
    /// Options for the given coordinate sequence, everything else default.
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        Self {
            coordinates,
            profile: RoutingProfile::default(),
            alternatives: false,
            steps: false,
            voice_instructions: false,
            banner_instructions: false,
            roundabout_exits: false,
            continue_straight: false,
            enable_refresh: false,
            exclude: None,
            language: None,
            bearings: None,
            radiuses: None,
            approaches: None,
            waypoint_indices: None,
            waypoint_names: None,
            waypoint_targets: None,
        }
    }
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
