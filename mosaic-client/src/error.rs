//! Error types for the mosaic pipeline
//!
//! Every variant except `Common` is fatal to a run: nothing is retried and
//! no row is ever rendered with placeholders.

use thiserror::Error;

/// Main error type for mosaic-client
#[derive(Error, Debug)]
pub enum MosaicError {
    /// Missing or unusable source image / output target
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tile geometry or sampling stride yields no samples
    #[error("Invalid tile size: {0}")]
    InvalidTileSize(String),

    /// Worker payload could not be decoded or lacks required fields
    #[error("Malformed tile response: {0}")]
    MalformedResponse(String),

    /// A worker could not decode the request it was handed
    #[error("Invalid input for the tile request (row {row})")]
    InvalidRequest { row: usize },

    /// Service answered with a non-200 status
    #[error("Tile service returned a bad status for row {row}, column {column}")]
    BadStatus { row: usize, column: usize },

    /// Service answered 200 with an empty body
    #[error("Tile service returned an empty body for row {row}, column {column}")]
    EmptyResponse { row: usize, column: usize },

    /// Request exceeded the fetch timeout
    #[error("Tile request timed out for row {row}, column {column}")]
    Timeout { row: usize, column: usize },

    /// Connection-level failure, or a status this client does not recognise
    #[error("Transport error for row {row}, column {column}: {message}")]
    TransportError {
        row: usize,
        column: usize,
        message: String,
    },

    /// Tile fragment is not a parsable markup element
    #[error("Cannot parse tile fragment for row {row}, column {column}: {message}")]
    RenderParseError {
        row: usize,
        column: usize,
        message: String,
    },

    /// Shared configuration / I/O error
    #[error("Common error: {0}")]
    Common(#[from] mosaic_common::Error),
}

/// Convenience Result type using MosaicError
pub type Result<T> = std::result::Result<T, MosaicError>;
