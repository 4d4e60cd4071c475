//! Autosave state machine
//!
//! `Idle → Saving → {Saved, Error}`, and from `Saved` or `Error` back to
//! `Saving` on the next trigger. An error stays visible until a later save
//! succeeds; nothing clears it on a timer.

use crate::error::PersistenceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Save indicator of an editing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    /// Nothing saved yet
    Idle,
    /// Write in progress
    Saving,
    /// Last write succeeded
    Saved,
    /// Last write failed
    Error,
}

impl SaveState {
    /// States reachable from this one
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [SaveState] {
        match self {
            Self::Idle | Self::Saved | Self::Error => &[Self::Saving],
            Self::Saving => &[Self::Saved, Self::Error],
        }
    }

    /// Whether `to` is reachable from this state
    #[inline]
    #[must_use]
    pub fn can_transition(self, to: SaveState) -> bool {
        self.allowed_transitions().contains(&to)
    }
}

impl Display for SaveState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Tracks the save indicator and the last failure
#[derive(Debug, Clone)]
pub struct SaveTracker {
    state: SaveState,
    last_error: Option<PersistenceError>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl SaveTracker {
    /// Tracker that has not saved anything
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SaveState::Idle,
            last_error: None,
            last_saved_at: None,
        }
    }

    /// Tracker for content already persisted
    #[inline]
    #[must_use]
    pub fn saved() -> Self {
        Self {
            state: SaveState::Saved,
            last_error: None,
            last_saved_at: None,
        }
    }

    /// Current indicator
    #[inline]
    #[must_use]
    pub fn state(&self) -> SaveState {
        self.state
    }

    /// Failure behind an `Error` indicator
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<&PersistenceError> {
        self.last_error.as_ref()
    }

    /// Time of the last successful save in this session
    #[inline]
    #[must_use]
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// A save started
    pub fn begin(&mut self) {
        self.transition(SaveState::Saving);
    }

    /// The save finished
    pub fn succeed(&mut self) {
        if self.transition(SaveState::Saved) {
            self.last_error = None;
            self.last_saved_at = Some(Utc::now());
        }
    }

    /// The save failed
    pub fn fail(&mut self, error: PersistenceError) {
        if self.transition(SaveState::Error) {
            tracing::error!("Save failed: {}", error);
            self.last_error = Some(error);
        }
    }

    fn transition(&mut self, to: SaveState) -> bool {
        if self.state.can_transition(to) {
            self.state = to;
            true
        } else {
            tracing::warn!("Ignoring save transition {} -> {}", self.state, to);
            false
        }
    }
}

impl Default for SaveTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_cycle() {
        let mut tracker = SaveTracker::new();
        tracker.begin();
        assert_eq!(tracker.state(), SaveState::Saving);
        tracker.succeed();
        assert_eq!(tracker.state(), SaveState::Saved);
        assert!(tracker.last_saved_at().is_some());
    }

    #[test]
    fn error_persists_until_next_success() {
        let mut tracker = SaveTracker::saved();
        tracker.begin();
        tracker.fail(PersistenceError::Storage("disk full".into()));
        assert_eq!(tracker.state(), SaveState::Error);

        tracker.begin();
        assert_eq!(tracker.state(), SaveState::Saving);
        assert!(tracker.last_error().is_some());

        tracker.succeed();
        assert_eq!(tracker.state(), SaveState::Saved);
        assert!(tracker.last_error().is_none());
    }

    #[test]
    fn completion_without_begin_is_ignored() {
        let mut tracker = SaveTracker::saved();
        tracker.fail(PersistenceError::Storage("x".into()));
        assert_eq!(tracker.state(), SaveState::Saved);
        assert!(tracker.last_error().is_none());
    }

    #[test]
    fn only_saving_completes() {
        for from in [SaveState::Idle, SaveState::Saved, SaveState::Error] {
            assert!(from.can_transition(SaveState::Saving));
            assert!(!from.can_transition(SaveState::Saved));
            assert!(!from.can_transition(SaveState::Error));
        }
    }
}
