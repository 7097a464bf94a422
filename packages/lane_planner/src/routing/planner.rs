//! Computes maneuver-tagged routes across the road graph. Each planner
//! instance holds a shared, read-only reference to the graph, so any number
//! of vehicle sessions can trace routes concurrently without coordination.

use std::sync::Arc;

use geo::{Distance, Euclidean, Point};
use log::debug;
use petgraph::algo::astar;
use petgraph::graph::{EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::common::error::{PlanningError, PlanningResult};
use crate::common::transform::{Transform, deflection};
use crate::routing::structs::{PathPoint, Route};
use crate::topology::builder::RoadGraph;
use crate::topology::structs::{EdgeData, Maneuver};

/// Positions closer together than this are treated as the same sample when
/// expanding a route
const DUPLICATE_EPS: f64 = 1e-6;

/// Global route planner. Cheap to create, one per trip requester
pub struct RoutePlanner {
    graph: Arc<RoadGraph>,
}

impl RoutePlanner {
    pub fn new(graph: Arc<RoadGraph>) -> Self {
        RoutePlanner { graph }
    }

    /// Project a world location onto the graph, rejecting coordinates which
    /// sit further from every lane than the configured projection limit
    fn project(&self, location: &Point) -> PlanningResult<NodeIndex> {
        let invalid = || PlanningError::InvalidLocation {
            x: location.x(),
            y: location.y(),
        };

        let (inx, dist) =
            self.graph.nearest_node(location).ok_or_else(invalid)?;

        if dist > self.graph.config().max_projection_distance {
            return Err(invalid());
        }

        Ok(inx)
    }

    /// Compute a maneuver-tagged path point sequence between two world
    /// locations. For a fixed graph this is a pure function of its inputs;
    /// identical calls return identical routes
    pub fn trace_route(
        &self,
        start: Point,
        end: Point,
    ) -> PlanningResult<Route> {
        let start_inx = self.project(&start)?;
        let end_inx = self.project(&end)?;

        let graph = self.graph.graph();
        let goal = graph[end_inx].transform.location;

        // Edge weights are physical lengths, so the straight-line distance
        // to the goal is an admissible heuristic
        let (_, node_path) = astar(
            graph,
            start_inx,
            |inx| inx == end_inx,
            |eref| eref.weight().length,
            |inx| Euclidean::distance(graph[inx].transform.location, goal),
        )
        .ok_or(PlanningError::NoPathFound)?;

        let route = self.expand_path(&node_path);

        debug!(
            "traced route: {} nodes -> {} path points, {:.1}m",
            node_path.len(),
            route.len(),
            route.total_length()
        );

        Ok(route)
    }

    /// Walk the node sequence returned by the graph search, expanding each
    /// hop into evenly-spaced path points tagged with the maneuver of the
    /// edge they lie on. A new tag takes effect exactly at its edge's entry
    /// node
    fn expand_path(&self, node_path: &[NodeIndex]) -> Route {
        let graph = self.graph.graph();
        let resolution = self.graph.config().sampling_resolution;

        let mut points = Vec::<PathPoint>::new();

        // Degenerate search where start and end project onto the same node
        if node_path.len() == 1 {
            let node = graph[node_path[0]];
            points.push(PathPoint {
                transform: node.transform,
                maneuver: Maneuver::LaneFollow,
                speed_limit: node.speed_limit,
            });
            return Route::new(points);
        }

        let mut active = Maneuver::LaneFollow;

        for pair in node_path.windows(2) {
            let edge = select_edge(
                graph.edges_connecting(pair[0], pair[1]).collect(),
                active,
            );
            let edata = *edge.weight();
            active = edata.maneuver;

            let src = graph[pair[0]];
            push_point(
                &mut points,
                PathPoint {
                    transform: src.transform,
                    maneuver: edata.maneuver,
                    speed_limit: src.speed_limit,
                },
            );

            // Interpolate interior samples for edges longer than the
            // sampling resolution (junction connectors, mostly)
            let dst = graph[pair[1]];
            let mut s = resolution;
            while s < edata.length - 1e-9 {
                let frac = s / edata.length;
                push_point(
                    &mut points,
                    PathPoint {
                        transform: interpolate(
                            &src.transform,
                            &dst.transform,
                            frac,
                        ),
                        maneuver: edata.maneuver,
                        speed_limit: src.speed_limit,
                    },
                );
                s += resolution;
            }
        }

        // The destination node, carrying the tag of the edge arriving at it
        let last = graph[*node_path.last().expect("Path cannot be empty")];
        push_point(
            &mut points,
            PathPoint {
                transform: last.transform,
                maneuver: active,
                speed_limit: last.speed_limit,
            },
        );

        Route::new(points)
    }
}

/// Pose at the given fraction along an edge. Headings are blended through
/// the signed deflection so that junction connectors curve smoothly
fn interpolate(src: &Transform, dst: &Transform, frac: f64) -> Transform {
    let x = src.location.x() + frac * (dst.location.x() - src.location.x());
    let y = src.location.y() + frac * (dst.location.y() - src.location.y());
    let yaw = src.yaw + frac * deflection(src.yaw, dst.yaw);
    Transform::new(x, y, yaw)
}

/// Append a point, collapsing consecutive samples which share a position.
/// The later sample wins, so a maneuver transition at a shared node takes
/// effect from that node onward
fn push_point(points: &mut Vec<PathPoint>, point: PathPoint) {
    if let Some(prev) = points.last() {
        if prev.transform.distance_to(&point.transform.location)
            < DUPLICATE_EPS
        {
            *points.last_mut().expect("Just checked non-empty") = point;
            return;
        }
    }
    points.push(point);
}

/// Pick the edge to follow between two consecutive path nodes. The strictly
/// shortest edge always wins; among equal lengths the previously active
/// maneuver is preferred, then anything which stays in lane, so a lane
/// change is only taken when it genuinely shortens the path
fn select_edge<'a>(
    mut candidates: Vec<EdgeReference<'a, EdgeData>>,
    active: Maneuver,
) -> EdgeReference<'a, EdgeData> {
    assert!(
        !candidates.is_empty(),
        "Search returned consecutive nodes with no connecting edge"
    );

    // Edge iteration order is not specified, sort for determinism
    candidates.sort_by_key(|eref| eref.id());

    let min_length = candidates
        .iter()
        .map(|eref| eref.weight().length)
        .fold(f64::MAX, f64::min);

    let shortest: Vec<&EdgeReference<EdgeData>> = candidates
        .iter()
        .filter(|eref| eref.weight().length <= min_length + 1e-9)
        .collect();

    let is_lane_change = |maneuver: Maneuver| {
        matches!(
            maneuver,
            Maneuver::ChangeLaneLeft | Maneuver::ChangeLaneRight
        )
    };

    let preferred = shortest
        .iter()
        .find(|eref| eref.weight().maneuver == active)
        .or_else(|| {
            shortest
                .iter()
                .find(|eref| !is_lane_change(eref.weight().maneuver))
        })
        .unwrap_or(&shortest[0]);

    **preferred
}
