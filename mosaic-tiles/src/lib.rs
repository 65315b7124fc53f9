//! mosaic-tiles library - reference tile rendering service
//!
//! Serves one SVG tile per requested color at `GET /color/:hex`, the
//! contract the mosaic client fetches against.

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Build application router
pub fn build_router() -> Router {
    Router::new()
        .merge(api::color_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
}
