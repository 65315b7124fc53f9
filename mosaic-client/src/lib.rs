//! mosaic-client library
//!
//! Builds an SVG mosaic of a raster image: the image is cut into a grid of
//! tiles, each tile's average color is sent to a remote tile service, and
//! the returned SVG fragments are placed row by row onto an output surface.
//!
//! # Components
//! - [`grid`]: image partitioning
//! - [`sampler`]: strided average color per tile
//! - [`codec`]: JSON messages between the pipeline and tile workers
//! - [`fetcher`]: HTTP tile fetching and detached workers
//! - [`barrier`]: per-row collection of tile results
//! - [`renderer`]: in-order placement of completed rows
//! - [`surface`]: output surface abstraction and SVG document
//! - [`pipeline`]: orchestration of one run

pub mod barrier;
pub mod codec;
pub mod error;
pub mod fetcher;
pub mod grid;
pub mod models;
pub mod pipeline;
pub mod renderer;
pub mod sampler;
pub mod surface;

pub use error::{MosaicError, Result};
pub use fetcher::{HttpTileFetcher, TileFetcher};
pub use grid::Grid;
pub use models::{MosaicRun, PipelineState};
pub use pipeline::{MosaicPipeline, PipelineConfig};
pub use sampler::{ColorSampler, Rgb};
pub use surface::{MosaicSurface, SvgDocument, TileNode};
