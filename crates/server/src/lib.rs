//! Grade prediction HTTP server

pub mod api;
pub mod config;
