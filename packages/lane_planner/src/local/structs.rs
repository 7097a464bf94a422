//! Defines the structs which cross the boundary between the local planner
//! and its collaborators: the per-tick navigation target handed to the
//! controller, the actuation values coming back, and route progress
//! summaries for telemetry.

use serde::Serialize;

use crate::topology::structs::Maneuver;

/// The pose and maneuver the vehicle should currently be steering towards
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetPoint {
    pub x: f64,
    pub y: f64,
    /// Heading at the target, radians
    pub yaw: f64,
    pub maneuver: Maneuver,
}

/// The full per-tick output of the local planner. This is the sole contract
/// an actuation component needs to implement against
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Target {
    /// The current head of the waypoint queue, or None once the route is
    /// exhausted
    pub point: Option<TargetPoint>,
    /// Suggested speed in m/s, already clamped to the posted limit when the
    /// planner is configured to follow it
    pub target_speed: f64,
    /// Number of path points remaining in the waypoint queue
    pub queue_len: usize,
    /// True once the queue is empty and no route buffer remains
    pub done: bool,
}

/// Normalised actuation values as produced by an external controller. The
/// planner itself never computes these
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Control {
    /// 0.0 (coasting) to 1.0 (full throttle)
    pub throttle: f64,
    /// 0.0 (released) to 1.0 (full braking)
    pub brake: f64,
    /// -1.0 (full left) to 1.0 (full right)
    pub steer: f64,
}

/// The seam between the planning stack and actuation. Implementations may
/// be rule-based, PID loops or learned policies; the planner only ever
/// hands them a Target and passes their Control through untouched
pub trait VehicleController {
    fn run_step(&mut self, target: &Target) -> Control;
}

/// Snapshot of how far along its route a vehicle has progressed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteProgress {
    /// Metres covered since the route start
    pub traveled: f64,
    /// Metres left to the destination
    pub remaining: f64,
    /// Total route length in metres
    pub total: f64,
    /// Completion percentage, 0-100
    pub percent: f64,
}

#[cfg(test)]
mod tests {

    use super::*;

    /// The serialized target should expose the flat field layout consumed
    /// by telemetry collaborators
    #[test]
    fn test_target_serialization() {
        let target = Target {
            point: Some(TargetPoint {
                x: 1.0,
                y: 2.0,
                yaw: 0.5,
                maneuver: Maneuver::TurnLeft,
            }),
            target_speed: 5.0,
            queue_len: 7,
            done: false,
        };

        let result =
            serde_json::to_value(&target).expect("Failed to serialize");

        assert_eq!(result["point"]["maneuver"], "TurnLeft");
        assert_eq!(result["queue_len"], 7);
        assert_eq!(result["done"], false);
    }

    /// A default control should be fully released
    #[test]
    fn test_default_control() {
        let control = Control::default();

        assert_eq!(control.throttle, 0.0);
        assert_eq!(control.brake, 0.0);
        assert_eq!(control.steer, 0.0);
    }
}
