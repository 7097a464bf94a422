//! This module contains structs which represent the configuration options
//! recognised by the planning stack. TopologyConfig drives the one-off road
//! graph construction, while PlannerConfig is carried by each local planner
//! instance for the lifetime of its vehicle session.

use serde::Deserialize;

/// Options for the road graph builder. The straight threshold is the
/// empirically tuned turn angle below which a junction edge is still
/// considered to be going straight
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Distance in metres between sampled nodes along a lane
    pub sampling_resolution: f64,
    /// Junction deflections below this angle (degrees) are tagged Straight
    pub straight_threshold_deg: f64,
    /// Locations further than this from every node cannot be projected onto
    /// the graph and are rejected as invalid
    pub max_projection_distance: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        TopologyConfig {
            sampling_resolution: 2.0,
            straight_threshold_deg: 10.0,
            max_projection_distance: 50.0,
        }
    }
}

impl TopologyConfig {
    /// The straight threshold in radians, as used by the edge classifier
    pub fn straight_threshold(&self) -> f64 {
        self.straight_threshold_deg.to_radians()
    }
}

/// Stores the caller's requested planner options exactly as they arrive in
/// the option dictionary. Unset fields fall back to their defaults
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerOpts {
    /// Speed to suggest to the controller, in km/h
    pub target_speed: f64,
    /// Expected spacing of the incoming route samples, in metres
    pub sampling_radius: f64,
    /// Lateral lane offset in metres, positive towards the right
    pub offset: f64,
    /// Fixed part of the waypoint consumption distance, in metres
    pub base_min_distance: f64,
    /// Speed-proportional part of the consumption distance, in seconds
    pub distance_ratio: f64,
    /// Whether to clamp the target speed to the posted limit of the road
    pub follow_speed_limits: bool,
    /// Upper bound on the number of path points held in the waypoint queue
    pub queue_horizon: usize,
}

impl Default for PlannerOpts {
    fn default() -> Self {
        PlannerOpts {
            target_speed: 20.0,
            sampling_radius: 2.0,
            offset: 0.0,
            base_min_distance: 3.0,
            distance_ratio: 0.5,
            follow_speed_limits: false,
            queue_horizon: 100,
        }
    }
}

impl From<PlannerOpts> for PlannerConfig {
    fn from(opts: PlannerOpts) -> PlannerConfig {
        PlannerConfig {
            // Stored in m/s so that it can be compared directly against
            // vehicle speeds and posted limits
            target_speed: opts.target_speed / 3.6,
            sampling_radius: opts.sampling_radius,
            offset: opts.offset,
            base_min_distance: opts.base_min_distance,
            distance_ratio: opts.distance_ratio,
            follow_speed_limits: opts.follow_speed_limits,
            queue_horizon: opts.queue_horizon.max(1),
        }
    }
}

/// Stores the planner options in the units used internally. It is not
/// expected that this struct will be directly instantiated; callers should
/// build a PlannerOpts and use .into() to convert it
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub target_speed: f64,
    pub sampling_radius: f64,
    pub offset: f64,
    pub base_min_distance: f64,
    pub distance_ratio: f64,
    pub follow_speed_limits: bool,
    pub queue_horizon: usize,
}

impl PlannerConfig {
    /// The distance within which a queued waypoint counts as consumed, for
    /// the provided vehicle speed (m/s). Faster vehicles look further ahead
    pub fn consumption_distance(&self, speed: f64) -> f64 {
        self.base_min_distance + self.distance_ratio * speed.max(0.0)
    }
}
