//! The per-vehicle local planner. It owns a bounded lookahead queue of
//! upcoming path points drawn from the assigned route, prunes the ones the
//! vehicle has passed and reports the head of the queue as the immediate
//! navigation target. Actuation is delegated entirely to an external
//! controller; the planner is a pure tracker.

use std::collections::VecDeque;

use geo::Point;
use log::{debug, warn};

use crate::common::config::PlannerConfig;
use crate::local::structs::{
    Control, RouteProgress, Target, TargetPoint, VehicleController,
};
use crate::routing::structs::{PathPoint, Route};

/// Lifecycle of a planner instance. A new route assignment always moves the
/// planner back to Active (or straight to Done for an empty route)
#[derive(Debug, Clone, Copy, PartialEq)]
enum PlannerPhase {
    Uninitialized,
    Active,
    Done,
}

/// Tracks progress along a single assigned route. One instance per vehicle
/// session, exclusively owned, stepped once per simulation tick
pub struct LocalPlanner {
    config: PlannerConfig,
    route: Route,
    /// Index of the next route entry which has not yet been enqueued
    cursor: usize,
    queue: VecDeque<PathPoint>,
    phase: PlannerPhase,
}

impl LocalPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        LocalPlanner {
            config,
            route: Route::default(),
            cursor: 0,
            queue: VecDeque::new(),
            phase: PlannerPhase::Uninitialized,
        }
    }

    /// Whether the assigned route has been fully consumed
    pub fn done(&self) -> bool {
        self.phase == PlannerPhase::Done
    }

    /// Change the suggested speed (km/h) between ticks
    pub fn set_speed(&mut self, speed_kmh: f64) {
        self.config.target_speed = speed_kmh / 3.6;
    }

    /// Toggle clamping of the suggested speed to the posted limit of the
    /// lane under the current target
    pub fn follow_speed_limits(&mut self, enabled: bool) {
        self.config.follow_speed_limits = enabled;
    }

    /// Assign a route. With clean_queue the current queue state is
    /// discarded atomically and tracking restarts from the new route start;
    /// otherwise the new route is appended after the existing buffer so an
    /// ongoing trip can be extended without discontinuity
    pub fn set_route(&mut self, route: Route, clean_queue: bool) {
        if clean_queue {
            self.queue.clear();
            self.cursor = 0;
            self.route = route;
        } else {
            let mut points = self.route.points().to_vec();
            points.extend_from_slice(route.points());
            self.route = Route::new(points);
        }

        self.phase = if self.queue.is_empty() && self.cursor >= self.route.len()
        {
            PlannerPhase::Done
        } else {
            PlannerPhase::Active
        };

        debug!(
            "route assigned: {} points buffered, clean_queue={}",
            self.route.len() - self.cursor,
            clean_queue
        );
    }

    /// Top the queue up to the configured horizon from the route buffer
    fn refill(&mut self) {
        while self.queue.len() < self.config.queue_horizon {
            let Some(point) = self.route.get(self.cursor) else {
                break;
            };
            self.queue.push_back(*point);
            self.cursor += 1;
        }
    }

    /// The consumption window for a queue entry. The final route point uses
    /// half the sample spacing so the goal is only consumed on arrival
    fn consumption_window(&self, queue_inx: usize, speed: f64) -> f64 {
        let is_final = self.cursor >= self.route.len()
            && queue_inx + 1 == self.queue.len();

        if is_final {
            self.config.sampling_radius / 2.0
        } else {
            self.config.consumption_distance(speed)
        }
    }

    /// Drop queue entries the vehicle has passed. An entry counts as passed
    /// once the vehicle's along-path advance beyond it is strictly positive
    /// and either its straight-line distance or the advance itself falls
    /// within the speed-adaptive window. Scanning stops at the first entry
    /// still ahead, so remaining entries are never reordered
    fn prune(&mut self, position: &Point, speed: f64) {
        let mut num_removed = 0;

        for (inx, point) in self.queue.iter().enumerate() {
            let advance = point.transform.advance_of(position);
            if advance <= 0.0 {
                break;
            }

            let window = self.consumption_window(inx, speed);
            let dist = point.transform.distance_to(position);
            if dist <= window || advance >= window {
                num_removed += 1;
            } else {
                break;
            }
        }

        for _ in 0..num_removed {
            self.queue.pop_front();
        }
    }

    /// Rebuild the queue from the route buffer, skipping over any buffered
    /// points the vehicle has already passed
    fn recover_from_stale(&mut self, position: &Point) {
        warn!(
            "vehicle is ahead of the entire waypoint queue, rebuilding from \
             the route buffer (cursor {})",
            self.cursor
        );

        self.queue.clear();
        while let Some(point) = self.route.get(self.cursor) {
            if point.transform.advance_of(position) <= 0.0 {
                break;
            }
            self.cursor += 1;
        }
        self.refill();
    }

    /// The per-tick operation: refill the queue, prune passed entries and
    /// report the current target. Never fails; once the route is exhausted
    /// it keeps reporting completion until a new route is assigned
    pub fn step(&mut self, position: Point, speed: f64) -> Target {
        if self.phase != PlannerPhase::Active {
            return Target {
                point: None,
                target_speed: self.config.target_speed,
                queue_len: 0,
                done: true,
            };
        }

        self.refill();
        self.prune(&position, speed);

        // Pruning stops at the first entry still ahead, so a surviving head
        // is always live. Only a fully consumed queue with route left in the
        // buffer means the vehicle has overrun the entire lookahead
        if self.queue.is_empty() && self.cursor < self.route.len() {
            self.recover_from_stale(&position);
        }

        let Some(head) = self.queue.front() else {
            self.phase = PlannerPhase::Done;
            return Target {
                point: None,
                target_speed: self.config.target_speed,
                queue_len: 0,
                done: true,
            };
        };

        let mut target_speed = self.config.target_speed;
        if self.config.follow_speed_limits {
            if let Some(limit) = head.speed_limit {
                target_speed = target_speed.min(limit / 3.6);
            }
        }

        let transform =
            head.transform.with_lateral_offset(self.config.offset);

        Target {
            point: Some(TargetPoint {
                x: transform.location.x(),
                y: transform.location.y(),
                yaw: transform.yaw,
                maneuver: head.maneuver,
            }),
            target_speed,
            queue_len: self.queue.len(),
            done: false,
        }
    }

    /// Hand the current target to an external controller and pass its
    /// actuation straight through. The planner computes no throttle, brake
    /// or steering of its own, so any control law can be substituted here
    pub fn apply_external_control<C: VehicleController>(
        &self,
        controller: &mut C,
        target: &Target,
    ) -> Control {
        controller.run_step(target)
    }

    /// Summarise progress along the assigned route for telemetry. Distances
    /// are derived from the route geometry and the position of the current
    /// queue head within it; consumed points are never rescanned
    pub fn route_progress(&self, position: &Point) -> RouteProgress {
        if self.route.is_empty() {
            return RouteProgress {
                traveled: 0.0,
                remaining: 0.0,
                total: 0.0,
                percent: 0.0,
            };
        }

        let head_inx =
            (self.cursor - self.queue.len()).min(self.route.len() - 1);
        let points = self.route.points();

        let gap = |inx: usize| {
            points[inx]
                .transform
                .distance_to(&points[inx + 1].transform.location)
        };

        let mut traveled: f64 = (0..head_inx).map(gap).sum();
        traveled += points[head_inx].transform.distance_to(position);

        let remaining: f64 = (head_inx..points.len() - 1).map(gap).sum();

        let total = traveled + remaining;
        let percent = if total > 0.0 {
            traveled / total * 100.0
        } else {
            0.0
        };

        RouteProgress {
            traveled,
            remaining,
            total,
            percent,
        }
    }
}
