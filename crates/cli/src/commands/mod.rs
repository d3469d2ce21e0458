//! CLI subcommand implementations

pub mod courses;
pub mod model;
pub mod predict;
