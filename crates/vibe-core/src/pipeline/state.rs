//! Turn state machine
//!
//! `Idle → Planning → Coding → FillingAssets → Done`, with `Error`
//! reachable from every working stage. Each state carries exactly the
//! values the next stage needs; only `Done` carries a document.

use crate::error::PipelineError;
use crate::types::{Instruction, Plan};
use std::fmt::{self, Display, Formatter};
use vibe_document::Document;

/// Stage tag of a [`PipelineState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Not started
    Idle,
    /// Planner running
    Planning,
    /// Coder running
    Coding,
    /// Images resolving
    FillingAssets,
    /// Finished with a document
    Done,
    /// Finished without a document
    Error,
}

impl PipelineStage {
    /// Every stage, in order
    pub const ALL: [Self; 6] = [
        Self::Idle,
        Self::Planning,
        Self::Coding,
        Self::FillingAssets,
        Self::Done,
        Self::Error,
    ];

    /// Whether the stage ends the turn
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Planning => "planning",
            Self::Coding => "coding",
            Self::FillingAssets => "filling-assets",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Stages reachable from `from`
#[must_use]
pub fn allowed_transitions(from: PipelineStage) -> Vec<PipelineStage> {
    use PipelineStage::{Coding, Done, Error, FillingAssets, Idle, Planning};
    match from {
        Idle => vec![Planning, Error],
        Planning => vec![Coding, Error],
        Coding => vec![FillingAssets, Error],
        FillingAssets => vec![Done, Error],
        Done | Error => vec![],
    }
}

/// Check a stage transition
///
/// # Errors
/// [`PipelineError::IllegalTransition`] when `to` is not reachable from
/// `from`.
pub fn validate_transition(from: PipelineStage, to: PipelineStage) -> Result<(), PipelineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PipelineError::IllegalTransition { from, to })
    }
}

/// Move from `from` to `next` if the transition is legal, otherwise to
/// `Error`
#[must_use]
pub fn advance(from: PipelineStage, next: PipelineState) -> PipelineState {
    match validate_transition(from, next.stage()) {
        Ok(()) => next,
        Err(error) => {
            tracing::error!("Rejected stage transition: {}", error);
            PipelineState::Error(error)
        }
    }
}

/// State of one turn
#[derive(Debug, Clone)]
pub enum PipelineState {
    /// Waiting to start
    Idle(Instruction),
    /// Planner about to run
    Planning(Instruction),
    /// Coder about to run with the plan
    Coding {
        /// The user's request for this turn
        instruction: Instruction,
        /// Planner output, or the fallback plan
        plan: Plan,
    },
    /// Coded document awaiting image resolution
    FillingAssets(Document),
    /// Finished document
    Done(Document),
    /// Turn failed; no document
    Error(PipelineError),
}

impl PipelineState {
    /// Stage tag
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Idle(_) => PipelineStage::Idle,
            Self::Planning(_) => PipelineStage::Planning,
            Self::Coding { .. } => PipelineStage::Coding,
            Self::FillingAssets(_) => PipelineStage::FillingAssets,
            Self::Done(_) => PipelineStage::Done,
            Self::Error(_) => PipelineStage::Error,
        }
    }

    /// Final result of a terminal state
    ///
    /// # Errors
    /// The turn's error, or `IllegalTransition` to `Done` for a state
    /// that has not finished.
    pub fn into_result(self) -> Result<Document, PipelineError> {
        match self {
            Self::Done(document) => Ok(document),
            Self::Error(error) => Err(error),
            other => Err(PipelineError::IllegalTransition {
                from: other.stage(),
                to: PipelineStage::Done,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path_is_allowed() {
        use PipelineStage::*;
        for (from, to) in [(Idle, Planning), (Planning, Coding), (Coding, FillingAssets), (FillingAssets, Done)] {
            assert!(validate_transition(from, to).is_ok(), "{from} -> {to}");
        }
    }

    #[test]
    fn error_reachable_from_every_working_stage() {
        for from in PipelineStage::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(validate_transition(from, PipelineStage::Error).is_ok());
        }
    }

    #[test]
    fn stages_cannot_be_skipped_or_left() {
        use PipelineStage::*;
        assert!(validate_transition(Idle, Coding).is_err());
        assert!(validate_transition(Planning, Done).is_err());
        assert!(validate_transition(Done, Planning).is_err());
        assert!(validate_transition(Error, Idle).is_err());
    }

    #[test]
    fn illegal_advance_lands_in_error() {
        let next = advance(PipelineStage::Idle, PipelineState::Done(Document::new("<p>x</p>")));
        assert_eq!(next.stage(), PipelineStage::Error);
        assert!(matches!(
            next.into_result(),
            Err(PipelineError::IllegalTransition {
                from: PipelineStage::Idle,
                to: PipelineStage::Done
            })
        ));
    }

    #[test]
    fn unfinished_state_has_no_result() {
        let state = PipelineState::Planning(Instruction::new("x"));
        assert!(state.into_result().is_err());
    }
}
