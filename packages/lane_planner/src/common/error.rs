//! Error types for the planning stack. Construction and route-search
//! failures are surfaced through these; the per-tick local planner step
//! never fails and so never produces one.

use std::fmt;

/// Failures which can occur while building the road graph or tracing a
/// route across it
#[derive(Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// A provided coordinate could not be projected onto any lane
    InvalidLocation { x: f64, y: f64 },
    /// The graph search exhausted all reachable nodes without finding the
    /// destination
    NoPathFound,
    /// The raw lane topology was inconsistent, e.g. a successor link which
    /// points at a lane that does not exist
    MalformedTopology(String),
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanningError::InvalidLocation { x, y } => {
                write!(f, "location ({x:.2}, {y:.2}) is not on the road graph")
            }
            PlanningError::NoPathFound => {
                write!(f, "no path exists between the requested locations")
            }
            PlanningError::MalformedTopology(msg) => {
                write!(f, "malformed lane topology: {msg}")
            }
        }
    }
}

impl std::error::Error for PlanningError {}

/// Result type alias for planning operations
pub type PlanningResult<T> = Result<T, PlanningError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Check that the rendered message contains the offending coordinates
    #[test]
    fn test_invalid_location_display() {
        let err = PlanningError::InvalidLocation { x: 12.5, y: -3.0 };

        let result = format!("{}", err);

        assert_eq!(
            result,
            "location (12.50, -3.00) is not on the road graph"
        );
    }

    /// Check that topology errors carry their detail message through
    #[test]
    fn test_malformed_topology_display() {
        let err =
            PlanningError::MalformedTopology("dangling successor".to_string());

        let result = format!("{}", err);

        assert_eq!(result, "malformed lane topology: dangling successor");
    }
}
