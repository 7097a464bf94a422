//! Based on the raw lane topology handed over by the map provider, generate
//! a petgraph graph which can be used for route search. Construction happens
//! once per map; the resulting RoadGraph is immutable and can be shared
//! freely across any number of route planner instances.

use geo::Point;
use log::debug;
use petgraph::graph::NodeIndex;
use petgraph::visit::IntoNodeReferences;
use petgraph::{Directed, Graph};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::common::config::TopologyConfig;
use crate::common::error::{PlanningError, PlanningResult};
use crate::common::transform::{Transform, deflection};
use crate::topology::structs::{
    EdgeData, LaneRef, LaneSegment, Maneuver, NodeData,
};

/// The directed graph over sampled lane positions, along with the config it
/// was built with. Read-only after construction; route planners hold this
/// behind an Arc and query it concurrently without locking
#[derive(Debug)]
pub struct RoadGraph {
    graph: Graph<NodeData, EdgeData, Directed, u32>,
    config: TopologyConfig,
}

impl RoadGraph {
    pub fn graph(&self) -> &Graph<NodeData, EdgeData, Directed, u32> {
        &self.graph
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Determine the closest sampled node to the provided location, along
    /// with its distance. Callers are expected to check the distance against
    /// the configured projection limit before trusting the result
    pub fn nearest_node(&self, location: &Point) -> Option<(NodeIndex, f64)> {
        let mut smallest_dist = f64::MAX;
        let mut closest_inx: Option<NodeIndex> = None;

        for (node_inx, node_data) in self.graph.node_references() {
            let dist = node_data.transform.distance_to(location);
            if dist < smallest_dist {
                smallest_dist = dist;
                closest_inx = Some(node_inx);
            }
        }

        closest_inx.map(|inx| (inx, smallest_dist))
    }
}

/// Classify the maneuver required to traverse a junction edge, based on the
/// signed deflection between the incoming and outgoing headings. The
/// threshold separating straight from turning traffic is configurable
fn classify_turn(entry_yaw: f64, exit_yaw: f64, threshold: f64) -> Maneuver {
    let angle = deflection(entry_yaw, exit_yaw);

    if angle.abs() < threshold {
        Maneuver::Straight
    } else if angle > 0.0 {
        Maneuver::TurnLeft
    } else {
        Maneuver::TurnRight
    }
}

/// Determine the longitudinal positions at which a lane should be sampled.
/// Samples sit at multiples of the resolution, with the final sample pinned
/// to the exact end of the lane
fn sample_positions(length: f64, resolution: f64) -> Vec<f64> {
    let mut positions = vec![0.0];
    let mut s = resolution;
    while s < length - 1e-9 {
        positions.push(s);
        s += resolution;
    }
    positions.push(length);
    positions
}

/// Check the builder options for values which cannot drive the sampling
/// loops. Configs arrive from external input, so bad values are reported as
/// construction errors in the same way as a bad topology
fn validate_config(config: &TopologyConfig) -> PlanningResult<()> {
    if !config.sampling_resolution.is_finite()
        || config.sampling_resolution <= 0.0
    {
        return Err(PlanningError::MalformedTopology(format!(
            "sampling resolution must be positive, got {}",
            config.sampling_resolution
        )));
    }

    if !config.max_projection_distance.is_finite()
        || config.max_projection_distance <= 0.0
    {
        return Err(PlanningError::MalformedTopology(format!(
            "projection distance must be positive, got {}",
            config.max_projection_distance
        )));
    }

    Ok(())
}

/// Check the raw topology for inconsistencies which would otherwise surface
/// as failures mid-query: duplicate lane identifiers, zero-length lanes and
/// links pointing at lanes which do not exist
fn validate_segments(segments: &[LaneSegment]) -> PlanningResult<()> {
    let mut seen = FxHashSet::<LaneRef>::default();

    for segment in segments {
        if !seen.insert(segment.lane_ref()) {
            return Err(PlanningError::MalformedTopology(format!(
                "duplicate lane {:?}",
                segment.lane_ref()
            )));
        }

        if segment.length() < 1e-9 {
            return Err(PlanningError::MalformedTopology(format!(
                "zero-length lane {:?}",
                segment.lane_ref()
            )));
        }
    }

    for segment in segments {
        let mut linked: Vec<LaneRef> = segment.successors.clone();
        linked.extend(segment.left_neighbour);
        linked.extend(segment.right_neighbour);

        for lane_ref in linked {
            if !seen.contains(&lane_ref) {
                return Err(PlanningError::MalformedTopology(format!(
                    "lane {:?} links to unknown lane {:?}",
                    segment.lane_ref(),
                    lane_ref
                )));
            }
        }
    }

    Ok(())
}

/// Add the sampled nodes for a single lane to the graph, returning their
/// indexes in route order. Junction lanes contribute only their entry and
/// exit nodes; all other lanes are sampled at the configured resolution
fn add_lane_nodes(
    graph: &mut Graph<NodeData, EdgeData, Directed, u32>,
    segment: &LaneSegment,
    resolution: f64,
) -> Vec<NodeIndex> {
    let length = segment.length();

    if segment.is_junction {
        // Entry and exit keep the headings provided by the map, as these
        // carry the turn geometry of the connecting lane
        let entry = NodeData {
            road_id: segment.road_id,
            lane_id: segment.lane_id,
            s: 0.0,
            transform: segment.start,
            speed_limit: segment.speed_limit,
        };
        let exit = NodeData {
            road_id: segment.road_id,
            lane_id: segment.lane_id,
            s: length,
            transform: segment.end,
            speed_limit: segment.speed_limit,
        };
        return vec![graph.add_node(entry), graph.add_node(exit)];
    }

    let chord_yaw = (segment.end.location.y() - segment.start.location.y())
        .atan2(segment.end.location.x() - segment.start.location.x());

    sample_positions(length, resolution)
        .into_iter()
        .map(|s| {
            let frac = s / length;
            let x = segment.start.location.x()
                + frac
                    * (segment.end.location.x() - segment.start.location.x());
            let y = segment.start.location.y()
                + frac
                    * (segment.end.location.y() - segment.start.location.y());

            graph.add_node(NodeData {
                road_id: segment.road_id,
                lane_id: segment.lane_id,
                s,
                transform: Transform::new(x, y, chord_yaw),
                speed_limit: segment.speed_limit,
            })
        })
        .collect()
}

/// One-time transformation of the raw lane topology into a queryable road
/// graph. Malformed input is reported here as a construction error rather
/// than surfacing during later queries
pub fn build_road_graph(
    segments: Vec<LaneSegment>,
    config: TopologyConfig,
) -> PlanningResult<RoadGraph> {
    validate_config(&config)?;
    validate_segments(&segments)?;

    let mut graph = Graph::<NodeData, EdgeData, Directed, u32>::new();

    // Sample every lane, keeping a mapping from lane identifiers to the
    // node indexes created for them
    let mut lane_nodes = FxHashMap::<LaneRef, Vec<NodeIndex>>::default();
    for segment in &segments {
        let nodes =
            add_lane_nodes(&mut graph, segment, config.sampling_resolution);
        lane_nodes.insert(segment.lane_ref(), nodes);
    }

    let threshold = config.straight_threshold();

    for segment in &segments {
        let nodes = &lane_nodes[&segment.lane_ref()];

        // Consecutive samples along a single lane. Junction lanes get one
        // edge from entry to exit, tagged with the turn required to cross
        for pair in nodes.windows(2) {
            let src = graph[pair[0]];
            let dst = graph[pair[1]];

            let maneuver = if segment.is_junction {
                classify_turn(
                    src.transform.yaw,
                    dst.transform.yaw,
                    threshold,
                )
            } else {
                Maneuver::LaneFollow
            };

            graph.add_edge(
                pair[0],
                pair[1],
                EdgeData {
                    length: src.transform.distance_to(&dst.transform.location),
                    maneuver,
                },
            );
        }

        // Continuation onto each physically reachable successor lane
        let last = *nodes.last().expect("Lane was sampled with no nodes");
        for successor in &segment.successors {
            let next_first = lane_nodes[successor][0];
            let length = graph[last]
                .transform
                .distance_to(&graph[next_first].transform.location);

            graph.add_edge(
                last,
                next_first,
                EdgeData {
                    length,
                    maneuver: Maneuver::LaneFollow,
                },
            );
        }

        // Lateral connections to parallel lanes. Edges run diagonally
        // forwards so that a lane change always makes progress
        let neighbours = [
            (segment.left_neighbour, Maneuver::ChangeLaneLeft),
            (segment.right_neighbour, Maneuver::ChangeLaneRight),
        ];
        for (neighbour, maneuver) in neighbours {
            let Some(lane_ref) = neighbour else { continue };
            let other_nodes = &lane_nodes[&lane_ref];

            for (inx, node) in nodes.iter().enumerate() {
                let Some(other) = other_nodes.get(inx + 1) else {
                    break;
                };
                let length = graph[*node]
                    .transform
                    .distance_to(&graph[*other].transform.location);

                graph.add_edge(*node, *other, EdgeData { length, maneuver });
            }
        }
    }

    debug!(
        "built road graph from {} lanes: {} nodes, {} edges",
        segments.len(),
        graph.node_count(),
        graph.edge_count()
    );

    Ok(RoadGraph { graph, config })
}

#[cfg(test)]
mod tests {

    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    /// A straight lane with no junction involvement
    fn get_test_lane(
        road_id: i64,
        from: (f64, f64),
        to: (f64, f64),
    ) -> LaneSegment {
        let yaw = (to.1 - from.1).atan2(to.0 - from.0);
        LaneSegment {
            road_id,
            lane_id: -1,
            start: Transform::new(from.0, from.1, yaw),
            end: Transform::new(to.0, to.1, yaw),
            is_junction: false,
            speed_limit: None,
            successors: Vec::new(),
            left_neighbour: None,
            right_neighbour: None,
        }
    }

    #[cfg(test)]
    mod test_sample_positions {
        use super::*;

        /// A lane which divides evenly should be sampled at exact multiples
        /// of the resolution
        #[test]
        fn test_even_split() {
            let result = sample_positions(10.0, 2.0);

            assert_eq!(result, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        }

        /// The final sample should be pinned to the lane end even when the
        /// resolution does not divide the length
        #[test]
        fn test_uneven_split() {
            let result = sample_positions(5.0, 2.0);

            assert_eq!(result, vec![0.0, 2.0, 4.0, 5.0]);
        }

        /// Lanes shorter than one resolution still get both endpoints
        #[test]
        fn test_short_lane() {
            let result = sample_positions(0.5, 2.0);

            assert_eq!(result, vec![0.0, 0.5]);
        }
    }

    #[cfg(test)]
    mod test_classify_turn {
        use super::*;

        /// Small deflections should be classified as going straight
        #[test]
        fn test_straight() {
            let threshold = 10.0_f64.to_radians();

            let result =
                classify_turn(0.0, 5.0_f64.to_radians(), threshold);

            assert_eq!(result, Maneuver::Straight);
        }

        /// A 95 degree left deflection should be classified as a left turn
        #[test]
        fn test_left() {
            let threshold = 10.0_f64.to_radians();

            let result =
                classify_turn(0.0, 95.0_f64.to_radians(), threshold);

            assert_eq!(result, Maneuver::TurnLeft);
        }

        /// The same deflection to the right should be a right turn
        #[test]
        fn test_right() {
            let threshold = 10.0_f64.to_radians();

            let result =
                classify_turn(0.0, -95.0_f64.to_radians(), threshold);

            assert_eq!(result, Maneuver::TurnRight);
        }

        /// Classification must not wrap the long way round the angle seam
        #[test]
        fn test_across_seam() {
            let threshold = 10.0_f64.to_radians();

            let result = classify_turn(
                std::f64::consts::PI - 0.05,
                -std::f64::consts::PI + 0.05,
                threshold,
            );

            assert_eq!(result, Maneuver::Straight);
        }
    }

    /// A single 100m lane at 2m resolution should produce 51 nodes joined
    /// by 50 lane-follow edges
    #[test]
    fn test_single_lane_sampling() {
        let segments = vec![get_test_lane(1, (0.0, 0.0), (100.0, 0.0))];

        let result =
            build_road_graph(segments, TopologyConfig::default()).unwrap();

        assert_eq!(result.node_count(), 51);
        assert_eq!(result.edge_count(), 50);

        for edge in result.graph().edge_weights() {
            assert_eq!(edge.maneuver, Maneuver::LaneFollow);
            assert_abs_diff_eq!(edge.length, 2.0, epsilon = 1e-9);
        }
    }

    /// A junction connector should contribute exactly one entry/exit node
    /// pair, with the connecting edge tagged by its turn angle
    #[test]
    fn test_junction_classification() {
        let mut incoming = get_test_lane(1, (0.0, 0.0), (100.0, 0.0));
        incoming.successors = vec![LaneRef::new(2, -1)];

        let connector = LaneSegment {
            road_id: 2,
            lane_id: -1,
            start: Transform::new(100.0, 0.0, 0.0),
            end: Transform::new(105.0, 5.0, 95.0_f64.to_radians()),
            is_junction: true,
            speed_limit: None,
            successors: Vec::new(),
            left_neighbour: None,
            right_neighbour: None,
        };

        let result =
            build_road_graph(vec![incoming, connector], TopologyConfig::default())
                .unwrap();

        // 51 nodes for the lane, 2 for the junction
        assert_eq!(result.node_count(), 53);

        let turn_edges: Vec<&EdgeData> = result
            .graph()
            .edge_weights()
            .filter(|edata| edata.maneuver == Maneuver::TurnLeft)
            .collect();

        assert_eq!(turn_edges.len(), 1);
    }

    /// Lane changes should create forward diagonal edges onto the
    /// neighbouring lane
    #[test]
    fn test_lane_change_edges() {
        let mut lane_a = get_test_lane(1, (0.0, 0.0), (10.0, 0.0));
        let mut lane_b = get_test_lane(1, (0.0, 3.5), (10.0, 3.5));
        lane_a.left_neighbour = Some(LaneRef::new(1, -2));
        lane_b.lane_id = -2;

        let result =
            build_road_graph(vec![lane_a, lane_b], TopologyConfig::default())
                .unwrap();

        let change_edges: Vec<&EdgeData> = result
            .graph()
            .edge_weights()
            .filter(|edata| edata.maneuver == Maneuver::ChangeLaneLeft)
            .collect();

        // 6 samples per lane, last one has no forward neighbour
        assert_eq!(change_edges.len(), 5);

        for edge in change_edges {
            // Forward diagonal: 2m longitudinal, 3.5m lateral
            assert_abs_diff_eq!(
                edge.length,
                (2.0_f64.powi(2) + 3.5_f64.powi(2)).sqrt(),
                epsilon = 1e-9
            );
        }
    }

    #[cfg(test)]
    mod test_validation {
        use super::*;

        /// A successor link pointing at a lane which does not exist should
        /// be caught at construction time
        #[test]
        fn test_dangling_successor() {
            let mut lane = get_test_lane(1, (0.0, 0.0), (10.0, 0.0));
            lane.successors = vec![LaneRef::new(99, -1)];

            let result =
                build_road_graph(vec![lane], TopologyConfig::default());

            match result {
                Err(PlanningError::MalformedTopology(_)) => (),
                _ => panic!("Expected a topology error"),
            }
        }

        /// Zero-length lanes cannot be sampled and should be rejected
        #[test]
        fn test_zero_length_lane() {
            let lane = get_test_lane(1, (5.0, 5.0), (5.0, 5.0));

            let result =
                build_road_graph(vec![lane], TopologyConfig::default());

            match result {
                Err(PlanningError::MalformedTopology(_)) => (),
                _ => panic!("Expected a topology error"),
            }
        }

        /// A zero sampling resolution would stall the sampling loop, so it
        /// must be rejected before any lane is touched
        #[test]
        fn test_non_positive_resolution() {
            let lane = get_test_lane(1, (0.0, 0.0), (10.0, 0.0));
            let config = TopologyConfig {
                sampling_resolution: 0.0,
                ..TopologyConfig::default()
            };

            let result = build_road_graph(vec![lane], config);

            match result {
                Err(PlanningError::MalformedTopology(_)) => (),
                _ => panic!("Expected a topology error"),
            }
        }

        /// A non-positive projection limit would reject every location, so
        /// it is treated as a construction error
        #[test]
        fn test_non_positive_projection_limit() {
            let lane = get_test_lane(1, (0.0, 0.0), (10.0, 0.0));
            let config = TopologyConfig {
                max_projection_distance: -1.0,
                ..TopologyConfig::default()
            };

            let result = build_road_graph(vec![lane], config);

            match result {
                Err(PlanningError::MalformedTopology(_)) => (),
                _ => panic!("Expected a topology error"),
            }
        }

        /// Two segments claiming the same road and lane ids should be
        /// rejected
        #[test]
        fn test_duplicate_lane() {
            let lane_a = get_test_lane(1, (0.0, 0.0), (10.0, 0.0));
            let lane_b = get_test_lane(1, (20.0, 0.0), (30.0, 0.0));

            let result = build_road_graph(
                vec![lane_a, lane_b],
                TopologyConfig::default(),
            );

            match result {
                Err(PlanningError::MalformedTopology(_)) => (),
                _ => panic!("Expected a topology error"),
            }
        }
    }

    #[cfg(test)]
    mod test_nearest_node {
        use super::*;
        use geo::Point;

        /// A point just off the lane start should project onto the first
        /// sampled node
        #[test]
        fn test_near_start() {
            let segments = vec![get_test_lane(1, (0.0, 0.0), (100.0, 0.0))];
            let graph =
                build_road_graph(segments, TopologyConfig::default()).unwrap();

            let (inx, dist) =
                graph.nearest_node(&Point::new(0.3, 1.0)).unwrap();

            let node = graph.graph()[inx];
            assert_abs_diff_eq!(node.s, 0.0);
            assert!(dist < 1.5);
        }

        /// Distant points still project, but report their true distance so
        /// the caller can reject them
        #[test]
        fn test_far_away() {
            let segments = vec![get_test_lane(1, (0.0, 0.0), (100.0, 0.0))];
            let graph =
                build_road_graph(segments, TopologyConfig::default()).unwrap();

            let (_, dist) =
                graph.nearest_node(&Point::new(50.0, 500.0)).unwrap();

            assert!(dist > graph.config().max_projection_distance);
        }

        /// An empty graph has nothing to project onto
        #[test]
        fn test_empty_graph() {
            let graph =
                build_road_graph(Vec::new(), TopologyConfig::default())
                    .unwrap();

            assert!(graph.nearest_node(&Point::new(0.0, 0.0)).is_none());
        }
    }

    /// Node headings along a lane should follow the lane's direction of
    /// travel
    #[test]
    fn test_node_headings() {
        let segments = vec![get_test_lane(1, (0.0, 0.0), (0.0, 50.0))];

        let graph =
            build_road_graph(segments, TopologyConfig::default()).unwrap();

        for node in graph.graph().node_weights() {
            assert_abs_diff_eq!(node.transform.yaw, FRAC_PI_2);
        }
    }
}
