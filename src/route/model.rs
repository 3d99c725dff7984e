//! Core route types: [`Route`], [`RouteLeg`], [`LegAnnotation`], [`Congestion`].

use serde::{Deserialize, Serialize};

use super::options::RouteOptions;

/// Traffic congestion level for a single route segment.
///
/// Wire values are lowercase strings; anything the server sends that we do not
/// recognize maps to [`Congestion::Unknown`] rather than failing the whole
/// deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Congestion {
    /// Free-flowing traffic.
    Low,
    /// Slower than free-flow.
    Moderate,
    /// Congested.
    Heavy,
    /// Stop-and-go or blocked.
    Severe,
    /// Not reported or unrecognized label.
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Congestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::Heavy => write!(f, "heavy"),
            Self::Severe => write!(f, "severe"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Per-segment metrics for one leg, held as parallel arrays.
///
/// The arrays are indexed by segment: entry `i` describes the segment between
/// geometry points `i` and `i + 1` of the leg.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LegAnnotation {
    /// Congestion level per segment.
    #[serde(default)]
    pub congestion: Vec<Congestion>,
    /// Distance per segment, meters.
    #[serde(default)]
    pub distance: Vec<f64>,
    /// Expected travel time per segment, seconds.
    #[serde(default)]
    pub duration: Vec<f64>,
}

/// One leg of a route: the stretch between two consecutive waypoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteLeg {
    /// Short human-readable description (major roads used).
    #[serde(default)]
    pub summary: String,
    /// Leg distance, meters.
    #[serde(default)]
    pub distance: f64,
    /// Expected leg travel time, seconds.
    #[serde(default)]
    pub duration: f64,
    /// Per-segment metrics, when the route was requested with annotations.
    #[serde(default)]
    pub annotation: Option<LegAnnotation>,
}

/// An immutable computed route.
///
/// Holds the ordered legs, the [`RouteOptions`] that produced the route, and
/// the server-issued request id used to correlate refresh calls. A route whose
/// `request_uuid` is absent was never accepted by the server as trackable and
/// cannot be refreshed.
///
/// Leg count never changes across refreshes; only annotation contents do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Ordered legs, one per waypoint pair.
    pub legs: Vec<RouteLeg>,
    /// Total route distance, meters.
    #[serde(default)]
    pub distance: f64,
    /// Expected total travel time, seconds.
    #[serde(default)]
    pub duration: f64,
    /// Encoded geometry, as returned by the routing service.
    #[serde(default)]
    pub geometry: Option<String>,
    /// The parameters this route was computed from.
    pub route_options: RouteOptions,
    /// Server-issued request id for refresh correlation.
    #[serde(default)]
    pub request_uuid: Option<String>,
    /// Position of this route in the server's alternative list.
    #[serde(default)]
    pub route_index: Option<u32>,
}

impl Route {
    /// Create a route from legs and the options that produced it.
    pub fn new(legs: Vec<RouteLeg>, route_options: RouteOptions) -> Self {
        Self {
            legs,
            distance: 0.0,
            duration: 0.0,
            geometry: None,
            route_options,
            request_uuid: None,
            route_index: None,
        }
    }

    /// Attach the server-issued request id.
    pub fn with_request_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.request_uuid = Some(uuid.into());
        self
    }

    /// Attach the route's index in the server's alternative list.
    pub fn with_route_index(mut self, index: u32) -> Self {
        self.route_index = Some(index);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn congestion_deserializes_lowercase_labels() {
        let parsed: Vec<Congestion> =
            serde_json::from_str(r#"["low", "moderate", "heavy", "severe"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Congestion::Low,
                Congestion::Moderate,
                Congestion::Heavy,
                Congestion::Severe
            ]
        );
    }

    #[test]
    fn congestion_unrecognized_label_maps_to_unknown() {
        let parsed: Congestion = serde_json::from_str(r#""gridlock""#).unwrap();
        assert_eq!(parsed, Congestion::Unknown);
    }

    #[test]
    fn congestion_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Congestion::Severe).unwrap(), r#""severe""#);
    }

    #[test]
    fn leg_annotation_tolerates_missing_arrays() {
        let annotation: LegAnnotation = serde_json::from_str(r#"{"congestion": ["low"]}"#).unwrap();
        assert_eq!(annotation.congestion, vec![Congestion::Low]);
        assert!(annotation.distance.is_empty());
        assert!(annotation.duration.is_empty());
    }

    #[test]
    fn route_deserializes_service_payload() {
        // Trimmed shape of a directions service response route
        let json = r#"{
            "legs": [
                {
                    "summary": "Main Street",
                    "distance": 1204.5,
                    "duration": 301.0,
                    "annotation": {
                        "congestion": ["low", "moderate"],
                        "distance": [600.0, 604.5],
                        "duration": [150.0, 151.0]
                    }
                }
            ],
            "distance": 1204.5,
            "duration": 301.0,
            "geometry": "_p~iF~ps|U_ulLnnqC",
            "route_options": {
                "coordinates": [
                    {"longitude": -122.42, "latitude": 37.78},
                    {"longitude": -122.45, "latitude": 37.91}
                ]
            },
            "request_uuid": "ckc72fwc80",
            "route_index": 0
        }"#;

        let route: Route = serde_json::from_str(json).unwrap();
        assert_eq!(route.legs.len(), 1);
        assert_eq!(route.request_uuid.as_deref(), Some("ckc72fwc80"));
        assert_eq!(route.route_index, Some(0));
        let annotation = route.legs[0].annotation.as_ref().unwrap();
        assert_eq!(annotation.congestion[1], Congestion::Moderate);
    }
}
