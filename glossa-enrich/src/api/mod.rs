//! HTTP API handlers for glossa-enrich

pub mod enrich;
pub mod health;

pub use enrich::enrich_routes;
pub use health::health_routes;
