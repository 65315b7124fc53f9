//! Data models for pipeline runs

pub mod mosaic_run;

pub use mosaic_run::{MosaicRun, PipelineState, StateTransition};
