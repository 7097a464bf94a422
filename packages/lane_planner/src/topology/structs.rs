//! Defines the structs which describe the raw lane topology handed over by
//! the map provider, along with the node and edge weights which end up
//! stored in the petgraph graph.

use serde::Serialize;

use crate::common::transform::Transform;

/// Discrete classification of the driving action required to traverse an
/// edge. Kept as a closed enum so that downstream controllers matching on it
/// are checked exhaustively at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Maneuver {
    LaneFollow,
    Straight,
    TurnLeft,
    TurnRight,
    ChangeLaneLeft,
    ChangeLaneRight,
}

/// Identifies a single lane within the raw topology by its road and lane ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneRef {
    pub road_id: i64,
    pub lane_id: i32,
}

impl LaneRef {
    pub fn new(road_id: i64, lane_id: i32) -> Self {
        LaneRef { road_id, lane_id }
    }
}

/// Container for a single lane segment as provided by the map. Segments are
/// straight stretches between their start and end transforms; curvature at
/// junctions is expressed through differing start and end headings
#[derive(Debug, Clone, PartialEq)]
pub struct LaneSegment {
    pub road_id: i64,
    pub lane_id: i32,
    pub start: Transform,
    pub end: Transform,
    /// Set for connecting lanes inside a junction. These are kept as a
    /// single entry/exit node pair rather than being sampled
    pub is_junction: bool,
    /// Posted speed limit in km/h, where the map provides one
    pub speed_limit: Option<f64>,
    /// Lanes which can be reached by driving over the end of this one
    pub successors: Vec<LaneRef>,
    /// Parallel lane reachable by a lane change to the left
    pub left_neighbour: Option<LaneRef>,
    /// Parallel lane reachable by a lane change to the right
    pub right_neighbour: Option<LaneRef>,
}

impl LaneSegment {
    /// Physical length of the segment, taken as the straight-line distance
    /// between its endpoints
    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end.location)
    }

    /// The identifier of this segment within the topology
    pub fn lane_ref(&self) -> LaneRef {
        LaneRef::new(self.road_id, self.lane_id)
    }
}

/// Sets the data which will be stored as node weights in the petgraph graph.
/// Each node is one sampled position along a lane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeData {
    pub road_id: i64,
    pub lane_id: i32,
    /// Longitudinal position of the sample along its lane, in metres from
    /// the lane start
    pub s: f64,
    pub transform: Transform,
    pub speed_limit: Option<f64>,
}

impl NodeData {
    pub fn lane_ref(&self) -> LaneRef {
        LaneRef::new(self.road_id, self.lane_id)
    }
}

/// Container for edge metadata which will be stored in the graph. The weight
/// used during route search is the physical length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeData {
    pub length: f64,
    pub maneuver: Maneuver,
}
