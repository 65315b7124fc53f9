//! Row barrier: per-row tile bookkeeping and the render trigger
//!
//! The barrier is the single consumer of tile results for the row in
//! flight. It owns the run's [`TileTable`] and [`RowCompletionSet`]; only
//! the renderer it calls may mark a row complete.

use crate::codec::{TileResponse, TileStatus};
use crate::error::{MosaicError, Result};
use crate::grid::Grid;
use crate::renderer::{RowAdvance, RowRenderer};
use crate::surface::MosaicSurface;
use tracing::{debug, warn};

/// Fragment per `(row, column)`, all cells initially empty
#[derive(Debug, Clone)]
pub struct TileTable {
    cells: Vec<Vec<Option<String>>>,
}

impl TileTable {
    pub fn new(grid: &Grid) -> Self {
        Self {
            cells: vec![vec![None; grid.column_count]; grid.row_count],
        }
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&str> {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(|cell| cell.as_deref())
    }

    /// Store a fragment; returns false if the cell was already filled
    pub fn fill(&mut self, row: usize, column: usize, fragment: String) -> bool {
        match self.cells.get_mut(row).and_then(|cells| cells.get_mut(column)) {
            Some(cell) if cell.is_none() => {
                *cell = Some(fragment);
                true
            }
            _ => false,
        }
    }

    pub fn row(&self, row: usize) -> &[Option<String>] {
        self.cells.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn filled_in_row(&self, row: usize) -> usize {
        self.row(row).iter().filter(|cell| cell.is_some()).count()
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        let cells = self.row(row);
        !cells.is_empty() && cells.iter().all(Option::is_some)
    }
}

/// Rows that have been drawn (not merely fetched)
#[derive(Debug, Clone)]
pub struct RowCompletionSet {
    rows: Vec<bool>,
}

impl RowCompletionSet {
    pub fn new(row_count: usize) -> Self {
        Self {
            rows: vec![false; row_count],
        }
    }

    pub fn is_complete(&self, row: usize) -> bool {
        self.rows.get(row).copied().unwrap_or(false)
    }

    /// Mark a row drawn; returns false if it already was
    pub fn mark_complete(&mut self, row: usize) -> bool {
        match self.rows.get_mut(row) {
            Some(done) if !*done => {
                *done = true;
                true
            }
            _ => false,
        }
    }

    pub fn completed_count(&self) -> usize {
        self.rows.iter().filter(|done| **done).count()
    }

    pub fn all_complete(&self) -> bool {
        self.rows.iter().all(|done| *done)
    }
}

/// Result of recording one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// Row still waiting on other columns
    Pending { filled: usize, total: usize },
    /// Cell was already filled; the new result was ignored
    Duplicate,
    /// Row was already drawn; nothing to do
    AlreadyRendered,
    /// This result completed the row and the row was drawn
    Rendered(RowAdvance),
}

/// Tile bookkeeping for one pipeline run
pub struct RowBarrier {
    grid: Grid,
    tiles: TileTable,
    completed: RowCompletionSet,
}

impl RowBarrier {
    /// Fresh tables sized to the full grid
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            tiles: TileTable::new(&grid),
            completed: RowCompletionSet::new(grid.row_count),
        }
    }

    pub fn tiles(&self) -> &TileTable {
        &self.tiles
    }

    pub fn completed(&self) -> &RowCompletionSet {
        &self.completed
    }

    /// Record a worker's result for `row` and draw the row once it is full
    ///
    /// Any non-OK status is fatal and returned as the matching error. A
    /// second result for a filled cell is ignored. Once a row is drawn,
    /// further results for it are no-ops.
    pub fn record_tile_result<S: MosaicSurface + ?Sized>(
        &mut self,
        row: usize,
        response: TileResponse,
        renderer: &mut RowRenderer<'_, S>,
    ) -> Result<BarrierOutcome> {
        if row >= self.grid.row_count {
            return Err(MosaicError::InvalidInput(format!(
                "row {} outside grid of {} rows",
                row, self.grid.row_count
            )));
        }
        if self.completed.is_complete(row) {
            debug!(row, "Result for an already rendered row ignored");
            return Ok(BarrierOutcome::AlreadyRendered);
        }

        let column = self.checked_column(row, &response)?;
        let fragment = response.fragment.ok_or_else(|| {
            MosaicError::MalformedResponse(format!(
                "OK response for row {}, column {} without fragment",
                row, column
            ))
        })?;

        if !self.tiles.fill(row, column, fragment) {
            warn!(row, column, "Duplicate tile result ignored");
            return Ok(BarrierOutcome::Duplicate);
        }

        if !self.tiles.is_row_full(row) {
            return Ok(BarrierOutcome::Pending {
                filled: self.tiles.filled_in_row(row),
                total: self.grid.column_count,
            });
        }

        match renderer.render_row(row, self.tiles.row(row), &mut self.completed)? {
            Some(advance) => Ok(BarrierOutcome::Rendered(advance)),
            None => Ok(BarrierOutcome::AlreadyRendered),
        }
    }

    /// Validate status and column; non-OK statuses become fatal errors
    fn checked_column(&self, row: usize, response: &TileResponse) -> Result<usize> {
        let column = match (&response.status, response.column_index) {
            (TileStatus::InvalidRequest, _) => return Err(MosaicError::InvalidRequest { row }),
            (_, Some(column)) => column,
            (_, None) => {
                return Err(MosaicError::MalformedResponse(format!(
                    "response for row {} without column index",
                    row
                )))
            }
        };

        if column >= self.grid.column_count {
            return Err(MosaicError::MalformedResponse(format!(
                "column {} outside grid of {} columns",
                column, self.grid.column_count
            )));
        }

        match &response.status {
            TileStatus::Ok => Ok(column),
            TileStatus::BadStatus => Err(MosaicError::BadStatus { row, column }),
            TileStatus::EmptyResponse => Err(MosaicError::EmptyResponse { row, column }),
            TileStatus::Timeout => Err(MosaicError::Timeout { row, column }),
            TileStatus::TransportError => Err(MosaicError::TransportError {
                row,
                column,
                message: TileStatus::TransportError.as_message().to_string(),
            }),
            TileStatus::Unrecognized(message) => Err(MosaicError::TransportError {
                row,
                column,
                message: message.clone(),
            }),
            TileStatus::InvalidRequest => Err(MosaicError::InvalidRequest { row }),
        }
    }
}
