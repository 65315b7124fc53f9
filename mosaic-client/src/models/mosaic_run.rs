//! Pipeline run state machine
//!
//! IDLE → PARTITIONED → ROW_IN_FLIGHT(0) → ROW_RENDERED(0) → ROW_IN_FLIGHT(1)
//! → … → DONE, with FAILED reachable from any non-terminal state.

use crate::error::{MosaicError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Created, inputs not yet validated
    Idle,
    /// Grid computed, tables allocated
    Partitioned,
    /// Fetches for this row are outstanding
    RowInFlight(usize),
    /// This row is on the surface
    RowRendered(usize),
    /// Last row rendered
    Done,
    /// Fatal error, terminal
    Failed,
}

impl PipelineState {
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (*self, next) {
            (Idle, Partitioned) => true,
            (Partitioned, RowInFlight(0)) => true,
            (RowInFlight(current), RowRendered(rendered)) => current == rendered,
            (RowRendered(rendered), RowInFlight(next_row)) => next_row == rendered + 1,
            (RowRendered(_), Done) => true,
            (state, Failed) => !state.is_terminal(),
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// One pipeline run (in-memory state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MosaicRun {
    /// Unique run identifier, carried by every event of the run
    pub run_id: Uuid,

    /// Current state
    pub state: PipelineState,

    /// Rows drawn so far
    pub rows_rendered: usize,

    /// Message of the fatal error, if the run failed
    pub failure: Option<String>,

    pub started_at: DateTime<Utc>,

    /// Set on entering a terminal state
    pub ended_at: Option<DateTime<Utc>>,
}

impl MosaicRun {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: PipelineState::Idle,
            rows_rendered: 0,
            failure: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new state, rejecting moves the state machine forbids
    pub fn transition_to(&mut self, new_state: PipelineState) -> Result<StateTransition> {
        if !self.state.can_transition_to(new_state) {
            return Err(MosaicError::Common(mosaic_common::Error::Internal(format!(
                "invalid pipeline transition {:?} -> {:?}",
                self.state, new_state
            ))));
        }

        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        match new_state {
            PipelineState::RowRendered(_) => self.rows_rendered += 1,
            PipelineState::Done | PipelineState::Failed => self.ended_at = Some(Utc::now()),
            _ => {}
        }

        Ok(transition)
    }

    /// Enter FAILED, remembering why
    pub fn fail(&mut self, error: &MosaicError) -> Result<StateTransition> {
        self.failure = Some(error.to_string());
        self.transition_to(PipelineState::Failed)
    }

    /// Check if run is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Row currently in flight, if any
    pub fn row_in_flight(&self) -> Option<usize> {
        match self.state {
            PipelineState::RowInFlight(row) => Some(row),
            _ => None,
        }
    }
}

impl Default for MosaicRun {
    fn default() -> Self {
        Self::new()
    }
}
