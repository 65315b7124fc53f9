//! Draws a fully fetched row onto the output surface

use crate::barrier::RowCompletionSet;
use crate::error::{MosaicError, Result};
use crate::grid::Grid;
use crate::surface::{MosaicSurface, TileNode};
use tracing::{debug, info};

/// What the pipeline does after a row has been drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAdvance {
    /// Dispatch this row next
    NextRow(usize),
    /// Last row drawn, run is done
    Finished,
}

/// Positions and appends tile fragments, one row at a time
pub struct RowRenderer<'s, S: MosaicSurface + ?Sized> {
    surface: &'s mut S,
    grid: Grid,
}

impl<'s, S: MosaicSurface + ?Sized> RowRenderer<'s, S> {
    pub fn new(surface: &'s mut S, grid: Grid) -> Self {
        Self { surface, grid }
    }

    /// Render `row` from its fragments and mark it complete
    ///
    /// Returns `Ok(None)` without touching the surface if the row is already
    /// marked complete. Every fragment is parsed before the first append, so
    /// a `RenderParseError` leaves the surface without any tile of this row.
    pub fn render_row(
        &mut self,
        row: usize,
        fragments: &[Option<String>],
        completed: &mut RowCompletionSet,
    ) -> Result<Option<RowAdvance>> {
        if completed.is_complete(row) {
            debug!(row, "Row already rendered, skipping");
            return Ok(None);
        }

        let mut nodes = Vec::with_capacity(fragments.len());
        for (column, fragment) in fragments.iter().enumerate() {
            let fragment = fragment.as_deref().ok_or_else(|| {
                MosaicError::InvalidInput(format!(
                    "row {} is missing the tile for column {}",
                    row, column
                ))
            })?;

            let mut node = TileNode::parse(fragment).map_err(|message| {
                MosaicError::RenderParseError {
                    row,
                    column,
                    message,
                }
            })?;

            let (x, y) = self.grid.tile_origin(row, column);
            node.set_attribute("x", x.to_string());
            node.set_attribute("y", y.to_string());
            nodes.push(node);
        }

        for node in nodes {
            self.surface.append_tile(node);
        }
        completed.mark_complete(row);
        info!(row, rows = self.grid.row_count, "Displayed row");

        if self.grid.is_last_row(row) {
            Ok(Some(RowAdvance::Finished))
        } else {
            Ok(Some(RowAdvance::NextRow(row + 1)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SvgDocument;

    fn fragments(count: usize) -> Vec<Option<String>> {
        (0..count)
            .map(|c| Some(format!(r#"<svg id="t{}" width="16" height="16"/>"#, c)))
            .collect()
    }

    #[test]
    fn test_row_positioned_in_column_order() {
        let grid = Grid::new(48, 32, 16, 16).unwrap();
        let mut document = SvgDocument::new();
        let mut completed = RowCompletionSet::new(grid.row_count);

        let advance = RowRenderer::new(&mut document, grid)
            .render_row(1, &fragments(3), &mut completed)
            .unwrap();

        assert_eq!(advance, Some(RowAdvance::Finished));
        assert!(completed.is_complete(1));
        let tiles = document.tiles();
        assert_eq!(tiles.len(), 3);
        for (column, tile) in tiles.iter().enumerate() {
            assert_eq!(tile.attribute("id"), Some(format!("t{}", column).as_str()));
            assert_eq!(tile.attribute("x"), Some((column * 16).to_string().as_str()));
            assert_eq!(tile.attribute("y"), Some("16"));
        }
    }

    #[test]
    fn test_non_final_row_requests_next() {
        let grid = Grid::new(32, 32, 16, 16).unwrap();
        let mut document = SvgDocument::new();
        let mut completed = RowCompletionSet::new(grid.row_count);

        let advance = RowRenderer::new(&mut document, grid)
            .render_row(0, &fragments(2), &mut completed)
            .unwrap();
        assert_eq!(advance, Some(RowAdvance::NextRow(1)));
    }

    #[test]
    fn test_rendering_twice_is_noop() {
        let grid = Grid::new(32, 32, 16, 16).unwrap();
        let mut document = SvgDocument::new();
        let mut completed = RowCompletionSet::new(grid.row_count);

        {
            let mut renderer = RowRenderer::new(&mut document, grid);
            renderer.render_row(0, &fragments(2), &mut completed).unwrap();
            let again = renderer.render_row(0, &fragments(2), &mut completed).unwrap();
            assert_eq!(again, None);
        }
        assert_eq!(document.tiles().len(), 2);
        assert_eq!(completed.completed_count(), 1);
    }

    #[test]
    fn test_parse_error_appends_nothing() {
        let grid = Grid::new(32, 16, 16, 16).unwrap();
        let mut document = SvgDocument::new();
        let mut completed = RowCompletionSet::new(grid.row_count);
        let row = vec![Some("<svg/>".to_string()), Some("<svg".to_string())];

        let result = RowRenderer::new(&mut document, grid).render_row(0, &row, &mut completed);

        assert!(matches!(
            result,
            Err(MosaicError::RenderParseError { row: 0, column: 1, .. })
        ));
        assert!(document.tiles().is_empty());
        assert!(!completed.is_complete(0));
    }
}
