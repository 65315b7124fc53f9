//! Color tile endpoint
//!
//! `GET /color/:hex` answers with a single circle tile filled with `#hex`,
//! sized to the shared tile geometry.

use axum::{
    extract::Path,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use mosaic_common::tiles::{TILE_HEIGHT, TILE_WIDTH};
use tracing::debug;

use crate::error::{ApiError, ApiResult};

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Validate a `rrggbb` color and normalize it to lowercase
pub fn parse_hex_color(hex: &str) -> ApiResult<String> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ApiError::BadRequest(format!(
            "'{}' is not a 6-digit hex color",
            hex
        )));
    }
    Ok(hex.to_ascii_lowercase())
}

/// SVG markup of one tile
pub fn render_tile(hex: &str) -> String {
    let cx = TILE_WIDTH as f32 / 2.0;
    let cy = TILE_HEIGHT as f32 / 2.0;
    let r = cx.min(cy);
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">"#,
            r##"<circle cx="{cx}" cy="{cy}" r="{r}" fill="#{hex}"/>"##,
            "</svg>"
        ),
        w = TILE_WIDTH,
        h = TILE_HEIGHT,
        cx = cx,
        cy = cy,
        r = r,
        hex = hex,
    )
}

/// GET /color/:hex
pub async fn get_color_tile(Path(hex): Path<String>) -> ApiResult<impl IntoResponse> {
    let hex = parse_hex_color(&hex)?;
    debug!(color = %hex, "Serving tile");
    Ok(([(header::CONTENT_TYPE, SVG_CONTENT_TYPE)], render_tile(&hex)))
}

/// Build color tile routes
pub fn color_routes() -> Router {
    Router::new().route("/color/:hex", get(get_color_tile))
}
