//! CLI commands

pub mod partition;
pub mod wait;
