//! Defines a struct to represent a pose on the road surface, combining a 2d
//! world location with a heading. Every sampled lane position and every route
//! point carries one of these, so the helper methods here are used throughout
//! the crate.

use geo::{Distance, Euclidean, Point};

/// A position on the map plus the heading (in radians, anticlockwise from
/// the positive x axis) of the lane at that position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub location: Point,
    pub yaw: f64,
}

impl Transform {
    /// Create a new transform from raw coordinates and a heading
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Transform {
            location: Point::new(x, y),
            yaw,
        }
    }

    /// Unit vector pointing along the heading of this transform
    pub fn forward_vector(&self) -> (f64, f64) {
        (self.yaw.cos(), self.yaw.sin())
    }

    /// Unit vector pointing 90 degrees to the right of the heading. Used when
    /// applying a lateral lane offset to a target point
    pub fn right_vector(&self) -> (f64, f64) {
        (self.yaw.sin(), -self.yaw.cos())
    }

    /// Straight-line distance from this transform to the provided point
    pub fn distance_to(&self, point: &Point) -> f64 {
        Euclidean::distance(self.location, *point)
    }

    /// Signed distance by which the provided point sits ahead of this
    /// transform, measured along its heading. Positive values mean the point
    /// has moved past this transform in the direction of travel
    pub fn advance_of(&self, point: &Point) -> f64 {
        let (fx, fy) = self.forward_vector();
        let dx = point.x() - self.location.x();
        let dy = point.y() - self.location.y();
        dx * fx + dy * fy
    }

    /// Shift the location laterally by the provided offset (metres, positive
    /// to the right of the heading), keeping the heading unchanged
    pub fn with_lateral_offset(&self, offset: f64) -> Transform {
        let (rx, ry) = self.right_vector();
        Transform {
            location: Point::new(
                self.location.x() + offset * rx,
                self.location.y() + offset * ry,
            ),
            yaw: self.yaw,
        }
    }
}

/// Wrap an angle in radians into the (-pi, pi] interval
pub fn normalize_angle(angle: f64) -> f64 {
    let mut wrapped = angle % (2.0 * std::f64::consts::PI);
    if wrapped > std::f64::consts::PI {
        wrapped -= 2.0 * std::f64::consts::PI;
    } else if wrapped <= -std::f64::consts::PI {
        wrapped += 2.0 * std::f64::consts::PI;
    }
    wrapped
}

/// Signed deflection between two headings, wrapped into (-pi, pi]. Positive
/// values indicate a turn to the left (anticlockwise)
pub fn deflection(from_yaw: f64, to_yaw: f64) -> f64 {
    normalize_angle(to_yaw - from_yaw)
}
