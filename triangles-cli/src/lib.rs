//! Triangles CLI Library
//!
//! Collaborators, configuration and scheduling around the triangles-core
//! publication pipeline.

pub mod config;
pub mod photo;
pub mod pipeline;
pub mod post;
pub mod progress;
pub mod render;
pub mod scheduler;
pub mod upload;

/// Startup banner, e.g. `triangles - 1.1.4`
pub fn version_banner() -> String {
    format!("triangles - {}", env!("CARGO_PKG_VERSION"))
}
