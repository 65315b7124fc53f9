//! End-to-end pipeline tests against a live tile service
//!
//! Each test serves a router on an ephemeral local port and points the HTTP
//! fetcher at it.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use image::{Rgba, RgbaImage};
use mosaic_client::surface::TileChild;
use mosaic_client::{
    MosaicError, MosaicPipeline, MosaicRun, PipelineConfig, PipelineState, Rgb, SvgDocument,
};

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config(service_url: &str) -> PipelineConfig {
    PipelineConfig {
        service_url: service_url.to_string(),
        fetch_timeout: Duration::from_secs(5),
        ..PipelineConfig::default()
    }
}

/// Image of `cols x rows` uniform 16x16 tiles
fn tiled_image(cols: u32, rows: u32, color_of: impl Fn(u32, u32) -> Rgb) -> RgbaImage {
    RgbaImage::from_fn(cols * 16, rows * 16, |x, y| {
        let c = color_of(x / 16, y / 16);
        Rgba([c.r, c.g, c.b, 255])
    })
}

fn tile_color(col: u32, row: u32) -> Rgb {
    Rgb::new((col * 100) as u8, (row * 100) as u8, 50)
}

fn circle_fill(tile: &mosaic_client::TileNode) -> Option<String> {
    tile.children().iter().find_map(|child| match child {
        TileChild::Element(node) if node.name() == "circle" => {
            node.attribute("fill").map(str::to_string)
        }
        _ => None,
    })
}

#[tokio::test]
async fn test_two_by_two_mosaic_against_reference_service() {
    let base = spawn_server(mosaic_tiles::build_router()).await;
    let image = tiled_image(2, 2, tile_color);
    let pipeline = MosaicPipeline::new(config(&base)).unwrap();

    let mut document = SvgDocument::new();
    let run = pipeline.run(&image, &mut document).await.unwrap();

    assert_eq!(run.state, PipelineState::Done);
    assert_eq!(run.rows_rendered, 2);
    assert!(run.ended_at.is_some());
    assert_eq!(document.view_box(), Some((32, 32)));

    let tiles = document.tiles();
    assert_eq!(tiles.len(), 4);

    let expected = [(0, 0, "0", "0"), (1, 0, "16", "0"), (0, 1, "0", "16"), (1, 1, "16", "16")];
    for (tile, (col, row, x, y)) in tiles.iter().zip(expected) {
        assert_eq!(tile.attribute("x"), Some(x));
        assert_eq!(tile.attribute("y"), Some(y));
        assert_eq!(
            circle_fill(tile),
            Some(format!("#{}", tile_color(col, row).to_hex()))
        );
    }

    let svg = document.to_svg_string();
    assert!(svg.contains(r#"viewBox="0 0 32 32""#));
}

#[tokio::test]
async fn test_partial_tiles_are_dropped() {
    let base = spawn_server(mosaic_tiles::build_router()).await;
    // 2 full columns (40 / 16), 1 full row (20 / 16)
    let image = RgbaImage::from_pixel(40, 20, Rgba([10, 20, 30, 255]));
    let pipeline = MosaicPipeline::new(config(&base)).unwrap();

    let mut document = SvgDocument::new();
    let run = pipeline.run(&image, &mut document).await.unwrap();

    assert_eq!(run.rows_rendered, 1);
    assert_eq!(document.view_box(), Some((40, 20)));
    assert_eq!(document.tiles().len(), 2);
    assert_eq!(circle_fill(&document.tiles()[1]).as_deref(), Some("#0a141e"));
}

#[tokio::test]
async fn test_non_200_status_fails_run() {
    let router = Router::new().route(
        "/color/:hex",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let base = spawn_server(router).await;
    let image = tiled_image(2, 2, tile_color);
    let pipeline = MosaicPipeline::new(config(&base)).unwrap();

    let mut run = MosaicRun::new();
    let mut document = SvgDocument::new();
    let result = pipeline.execute(&mut run, &image, &mut document).await;

    assert!(matches!(result, Err(MosaicError::BadStatus { row: 0, .. })));
    assert_eq!(run.state, PipelineState::Failed);
    assert!(run.failure.is_some());
    assert!(document.tiles().is_empty(), "no partial row may be drawn");
}

#[tokio::test]
async fn test_empty_body_fails_run() {
    let router = Router::new().route("/color/:hex", get(|| async { "" }));
    let base = spawn_server(router).await;
    let image = tiled_image(1, 1, tile_color);
    let pipeline = MosaicPipeline::new(config(&base)).unwrap();

    let mut document = SvgDocument::new();
    let result = pipeline.run(&image, &mut document).await;

    assert!(matches!(
        result,
        Err(MosaicError::EmptyResponse { row: 0, column: 0 })
    ));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let router = Router::new().route(
        "/color/:hex",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "<svg/>"
        }),
    );
    let base = spawn_server(router).await;
    let image = tiled_image(1, 1, tile_color);
    let pipeline = MosaicPipeline::new(PipelineConfig {
        fetch_timeout: Duration::from_millis(200),
        ..config(&base)
    })
    .unwrap();

    let mut document = SvgDocument::new();
    let result = pipeline.run(&image, &mut document).await;

    assert!(
        matches!(result, Err(MosaicError::Timeout { row: 0, column: 0 })),
        "unexpected result: {:?}",
        result.map(|run| run.state)
    );
}

#[tokio::test]
async fn test_unparsable_fragment_fails_run() {
    let router = Router::new().route("/color/:hex", get(|| async { "<svg><circle" }));
    let base = spawn_server(router).await;
    let image = tiled_image(2, 1, tile_color);
    let pipeline = MosaicPipeline::new(config(&base)).unwrap();

    let mut document = SvgDocument::new();
    let result = pipeline.run(&image, &mut document).await;

    assert!(matches!(
        result,
        Err(MosaicError::RenderParseError { row: 0, .. })
    ));
    assert!(document.tiles().is_empty());
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let image = tiled_image(1, 1, tile_color);
    let pipeline = MosaicPipeline::new(config(&format!("http://{}", addr))).unwrap();

    let mut document = SvgDocument::new();
    let result = pipeline.run(&image, &mut document).await;

    assert!(matches!(
        result,
        Err(MosaicError::TransportError { row: 0, column: 0, .. })
    ));
}

#[tokio::test]
async fn test_image_smaller_than_tile_is_invalid_input() {
    let image = RgbaImage::from_pixel(10, 40, Rgba([0, 0, 0, 255]));
    let pipeline = MosaicPipeline::new(config("http://127.0.0.1:9")).unwrap();

    let mut document = SvgDocument::new();
    let result = pipeline.run(&image, &mut document).await;

    assert!(matches!(result, Err(MosaicError::InvalidInput(_))));
    assert_eq!(document.view_box(), None);
}

#[tokio::test]
async fn test_empty_image_is_invalid_input() {
    let image = RgbaImage::new(0, 0);
    let pipeline = MosaicPipeline::new(config("http://127.0.0.1:9")).unwrap();

    let mut document = SvgDocument::new();
    let result = pipeline.run(&image, &mut document).await;

    assert!(matches!(result, Err(MosaicError::InvalidInput(_))));
}

#[tokio::test]
async fn test_zero_tile_width_is_invalid_tile_size() {
    let image = tiled_image(2, 2, tile_color);
    let pipeline = MosaicPipeline::new(PipelineConfig {
        tile_width: 0,
        ..config("http://127.0.0.1:9")
    })
    .unwrap();

    let mut document = SvgDocument::new();
    let result = pipeline.run(&image, &mut document).await;

    assert!(matches!(result, Err(MosaicError::InvalidTileSize(_))));
}

#[test]
fn test_zero_sampling_stride_rejected_at_construction() {
    let result = MosaicPipeline::new(PipelineConfig {
        sampling_stride: 0,
        ..PipelineConfig::default()
    });
    assert!(matches!(result, Err(MosaicError::InvalidTileSize(_))));
}
