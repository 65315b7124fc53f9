//! Service status endpoint
//!
//! Reports the tile geometry this service renders so a client can check it
//! against its own grid before starting a run.

use axum::{routing::get, Json, Router};
use mosaic_common::tiles::{COLOR_ROUTE_PREFIX, TILE_HEIGHT, TILE_WIDTH};
use serde::Serialize;

/// Tile size served by `/color/:hex`
#[derive(Debug, Serialize)]
pub struct TileGeometry {
    pub width: u32,
    pub height: u32,
}

/// GET /health body
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub color_route: &'static str,
    pub tile: TileGeometry,
}

/// GET /health
pub async fn service_status() -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        color_route: COLOR_ROUTE_PREFIX,
        tile: TileGeometry {
            width: TILE_WIDTH,
            height: TILE_HEIGHT,
        },
    })
}

pub fn health_routes() -> Router {
    Router::new().route("/health", get(service_status))
}
