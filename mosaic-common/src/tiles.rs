//! Constants shared between the mosaic client and the tile service.
//!
//! Both sides must agree on the tile geometry: the client partitions the
//! source image with these dimensions and the service renders fragments of
//! the same size.

/// Default tile width in pixels
pub const TILE_WIDTH: u32 = 16;

/// Default tile height in pixels
pub const TILE_HEIGHT: u32 = 16;

/// Sample every Nth pixel along each axis when averaging a tile's color
pub const DEFAULT_SAMPLING_STRIDE: u32 = 5;

/// Per-tile fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Path prefix of the tile rendering endpoint (`/color/<hex>`)
pub const COLOR_ROUTE_PREFIX: &str = "/color/";

/// Compiled default service location (matches the reference service port)
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8765";
