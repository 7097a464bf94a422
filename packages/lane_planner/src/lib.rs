//! A lane-level motion planning stack for simulated road networks. Lane
//! topology goes in one end; per-tick navigation targets come out the other.
//!
//! The crate is split into three stages which mirror the life of a trip:
//! [`topology`] builds a directed, maneuver-tagged road graph from lane
//! segments, [`routing`] searches it and expands the result into an evenly
//! spaced route, and [`local`] consumes that route tick by tick while the
//! vehicle drives.

pub mod common;
pub mod local;
pub mod routing;
pub mod topology;
