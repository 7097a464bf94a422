//! This module focuses on following a planned route tick by tick: a bounded
//! waypoint queue is pruned as the vehicle advances and its head is reported
//! as the current navigation target.

pub mod planner;
pub mod structs;
