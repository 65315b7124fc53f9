//! Mosaic pipeline orchestrator
//!
//! Partitions the source image, then works through the grid one row at a
//! time: sample every tile of the row, launch one worker per tile, feed the
//! workers' results to the row barrier and, once the barrier has drawn the
//! row, start the next one.
//!
//! # Ordering
//! - Tiles within a row are fetched concurrently and may finish in any order
//! - Row `r + 1` is not dispatched until row `r` is on the surface
//!
//! # Error Handling
//! Every error is fatal to the run. Workers already in flight are not
//! cancelled; their results are discarded once the run has failed.

use crate::barrier::{BarrierOutcome, RowBarrier};
use crate::codec::{self, TileRequest};
use crate::error::{MosaicError, Result};
use crate::fetcher::{spawn_tile_worker, HttpTileFetcher, TileFetcher};
use crate::grid::Grid;
use crate::models::{MosaicRun, PipelineState};
use crate::renderer::{RowAdvance, RowRenderer};
use crate::sampler::ColorSampler;
use crate::surface::MosaicSurface;
use chrono::Utc;
use image::RgbaImage;
use mosaic_common::config::TomlConfig;
use mosaic_common::events::{EventBus, MosaicEvent};
use mosaic_common::tiles::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_SAMPLING_STRIDE, DEFAULT_SERVICE_URL, TILE_HEIGHT,
    TILE_WIDTH,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base URL of the tile service; requests go to `<service_url>/color/<hex>`
    pub service_url: String,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Sample every Nth pixel along each axis
    pub sampling_stride: u32,
    /// Timeout of a single tile fetch
    pub fetch_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            tile_width: TILE_WIDTH,
            tile_height: TILE_HEIGHT,
            sampling_stride: DEFAULT_SAMPLING_STRIDE,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl PipelineConfig {
    /// Build from bootstrap configuration and an already resolved service URL
    pub fn from_toml(config: &TomlConfig, service_url: String) -> Self {
        Self {
            service_url,
            tile_width: config.tiles.width,
            tile_height: config.tiles.height,
            sampling_stride: config.sampling_stride,
            fetch_timeout: config.fetch.timeout(),
        }
    }
}

/// Pipeline orchestrator
///
/// Holds no per-run state: every call to [`MosaicPipeline::run`] allocates
/// its own tables, so one pipeline may serve several runs concurrently.
pub struct MosaicPipeline {
    config: PipelineConfig,
    sampler: ColorSampler,
    fetcher: Arc<dyn TileFetcher>,
    event_bus: Option<EventBus>,
}

impl MosaicPipeline {
    /// Create a pipeline fetching over HTTP
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let fetcher = HttpTileFetcher::new(config.fetch_timeout)?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create a pipeline with a custom fetcher
    pub fn with_fetcher(config: PipelineConfig, fetcher: Arc<dyn TileFetcher>) -> Result<Self> {
        let sampler = ColorSampler::new(config.sampling_stride)?;
        Ok(Self {
            config,
            sampler,
            fetcher,
            event_bus: None,
        })
    }

    /// Publish progress events on `event_bus`
    pub fn with_events(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the mosaic of `image` onto `surface`
    ///
    /// Returns the finished run record, or the fatal error that stopped it.
    pub async fn run<S>(&self, image: &RgbaImage, surface: &mut S) -> Result<MosaicRun>
    where
        S: MosaicSurface + ?Sized,
    {
        let mut run = MosaicRun::new();
        self.execute(&mut run, image, surface).await?;
        Ok(run)
    }

    /// Drive `run` to DONE or FAILED
    ///
    /// The caller keeps the run record, so its final state can be inspected
    /// after a failure.
    pub async fn execute<S>(
        &self,
        run: &mut MosaicRun,
        image: &RgbaImage,
        surface: &mut S,
    ) -> Result<()>
    where
        S: MosaicSurface + ?Sized,
    {
        info!(
            run_id = %run.run_id,
            width = image.width(),
            height = image.height(),
            service_url = %self.config.service_url,
            "Starting mosaic run"
        );

        let result = self.drive(run, image, surface).await;

        if let Err(e) = &result {
            let row = run.row_in_flight();
            if !run.is_terminal() {
                if let Err(transition_error) = run.fail(e) {
                    warn!(
                        run_id = %run.run_id,
                        error = %transition_error,
                        "Could not record failure"
                    );
                }
            }
            error!(run_id = %run.run_id, row = ?row, error = %e, "Mosaic run failed");
            self.emit(MosaicEvent::RunFailed {
                run_id: run.run_id,
                row,
                message: e.to_string(),
                timestamp: Utc::now(),
            });
        }

        result
    }

    async fn drive<S>(&self, run: &mut MosaicRun, image: &RgbaImage, surface: &mut S) -> Result<()>
    where
        S: MosaicSurface + ?Sized,
    {
        if image.width() == 0 || image.height() == 0 {
            return Err(MosaicError::InvalidInput(
                "source image has no pixels".to_string(),
            ));
        }

        let grid = Grid::new(
            image.width(),
            image.height(),
            self.config.tile_width,
            self.config.tile_height,
        )?;
        let mut barrier = RowBarrier::new(grid);
        surface.set_view_box(image.width(), image.height());
        run.transition_to(PipelineState::Partitioned)?;

        info!(
            run_id = %run.run_id,
            columns = grid.column_count,
            rows = grid.row_count,
            "Image partitioned"
        );
        self.emit(MosaicEvent::RunStarted {
            run_id: run.run_id,
            column_count: grid.column_count,
            row_count: grid.row_count,
            timestamp: Utc::now(),
        });

        let mut renderer = RowRenderer::new(surface, grid);
        let mut row = 0;

        loop {
            run.transition_to(PipelineState::RowInFlight(row))?;
            let mut results = self.dispatch_row(run.run_id, image, &grid, row)?;
            let advance = self
                .await_row(run.run_id, row, &mut results, &mut barrier, &mut renderer)
                .await?;

            run.transition_to(PipelineState::RowRendered(row))?;
            self.emit(MosaicEvent::RowRendered {
                run_id: run.run_id,
                row,
                timestamp: Utc::now(),
            });

            match advance {
                RowAdvance::NextRow(next) => row = next,
                RowAdvance::Finished => break,
            }
        }

        run.transition_to(PipelineState::Done)?;
        info!(
            run_id = %run.run_id,
            rows = run.rows_rendered,
            "Mosaic run completed"
        );
        self.emit(MosaicEvent::RunCompleted {
            run_id: run.run_id,
            rows_rendered: run.rows_rendered,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Sample every tile of `row` and launch one worker per column
    ///
    /// All colors are computed before the first worker starts, so a sampling
    /// error never leaves a partially dispatched row.
    fn dispatch_row(
        &self,
        run_id: Uuid,
        image: &RgbaImage,
        grid: &Grid,
        row: usize,
    ) -> Result<mpsc::UnboundedReceiver<String>> {
        let mut requests = Vec::with_capacity(grid.column_count);
        for column in 0..grid.column_count {
            let (x, y) = grid.tile_origin(row, column);
            let color = self
                .sampler
                .sample(image, x, y, grid.tile_width, grid.tile_height)?;
            requests.push(TileRequest::new(&self.config.service_url, column, color));
        }

        self.emit(MosaicEvent::RowStarted {
            run_id,
            row,
            timestamp: Utc::now(),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        for request in requests {
            debug!(
                run_id = %run_id,
                row,
                column = request.column_index,
                url = %request.url,
                "Dispatching tile"
            );
            self.emit(MosaicEvent::TileRequested {
                run_id,
                row,
                column: request.column_index,
                url: request.url.clone(),
                timestamp: Utc::now(),
            });
            // Detached: the worker ends on its own after one response
            spawn_tile_worker(
                Arc::clone(&self.fetcher),
                codec::encode_request(&request),
                tx.clone(),
            );
        }

        Ok(rx)
    }

    /// Consume worker results for `row` until the barrier draws it
    async fn await_row<S>(
        &self,
        run_id: Uuid,
        row: usize,
        results: &mut mpsc::UnboundedReceiver<String>,
        barrier: &mut RowBarrier,
        renderer: &mut RowRenderer<'_, S>,
    ) -> Result<RowAdvance>
    where
        S: MosaicSurface + ?Sized,
    {
        loop {
            let payload = results.recv().await.ok_or_else(|| {
                MosaicError::Common(mosaic_common::Error::Internal(format!(
                    "tile workers for row {} exited before the row completed",
                    row
                )))
            })?;

            let response = codec::decode_response(&payload)?;
            let column = response.column_index;

            match barrier.record_tile_result(row, response, renderer)? {
                BarrierOutcome::Pending { filled, total } => {
                    debug!(run_id = %run_id, row, column = ?column, filled, total, "Tile received");
                    self.emit_tile_received(run_id, row, column);
                }
                BarrierOutcome::Duplicate | BarrierOutcome::AlreadyRendered => {}
                BarrierOutcome::Rendered(advance) => {
                    self.emit_tile_received(run_id, row, column);
                    return Ok(advance);
                }
            }
        }
    }

    fn emit_tile_received(&self, run_id: Uuid, row: usize, column: Option<usize>) {
        if let Some(column) = column {
            self.emit(MosaicEvent::TileReceived {
                run_id,
                row,
                column,
                timestamp: Utc::now(),
            });
        }
    }

    fn emit(&self, event: MosaicEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }
}
