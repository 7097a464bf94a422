//! Shared building blocks used across the planning stack: poses and the
//! angular helpers which operate on them, configuration and the error type.

pub mod config;
pub mod error;
pub mod transform;
