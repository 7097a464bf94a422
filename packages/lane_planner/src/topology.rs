//! This module focuses on turning a flat list of lane segments into a
//! directed, maneuver-tagged road graph which the route planner can search.

pub mod builder;
pub mod structs;
