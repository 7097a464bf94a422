//! Defines the structs which make up a planned route: the individual
//! interpolated samples and the ordered sequence handed over to the local
//! planner.

use rustc_hash::FxHashMap;

use crate::common::transform::Transform;
use crate::topology::structs::Maneuver;

/// A single interpolated sample along a planned route, combining a pose
/// with the maneuver active at that sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub transform: Transform,
    pub maneuver: Maneuver,
    /// Posted speed limit (km/h) of the lane this sample sits on, where the
    /// map provides one
    pub speed_limit: Option<f64>,
}

/// An ordered sequence of path points from start to destination. Produced
/// once per trip by the route planner and never mutated afterwards
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    points: Vec<PathPoint>,
}

impl Route {
    pub fn new(points: Vec<PathPoint>) -> Self {
        Route { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, inx: usize) -> Option<&PathPoint> {
        self.points.get(inx)
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    /// Total physical length of the route, summed over consecutive samples
    pub fn total_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].transform.distance_to(&pair[1].transform.location))
            .sum()
    }

    /// Count how many samples carry each maneuver tag. Useful when logging
    /// the shape of a freshly planned trip
    pub fn maneuver_counts(&self) -> FxHashMap<Maneuver, usize> {
        let mut counts = FxHashMap::<Maneuver, usize>::default();
        for point in &self.points {
            *counts.entry(point.maneuver).or_insert(0) += 1;
        }
        counts
    }
}
