//! # Mosaic Common Library
//!
//! Shared code for the mosaic client and the tile service including:
//! - Error types
//! - Configuration loading (TOML bootstrap + environment overrides)
//! - Tracing initialisation
//! - Tile constants shared between client and service
//! - Event types (MosaicEvent enum) and the EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod tiles;

pub use error::{Error, Result};
pub use events::{EventBus, MosaicEvent};
