//! This module focuses on global route planning: projecting world
//! coordinates onto the road graph, finding the shortest path between them
//! and expanding that path into an evenly spaced, maneuver-tagged route.

pub mod planner;
pub mod structs;
