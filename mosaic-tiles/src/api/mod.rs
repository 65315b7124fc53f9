//! HTTP handlers

pub mod color;
pub mod health;

pub use color::color_routes;
pub use health::health_routes;
