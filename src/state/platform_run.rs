//! State of one platform's pipeline run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use distkit_protocol::Platform;

use super::{next_seq, now_utc, TerminalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformRunState {
    /// Not started
    Pending,
    /// Fresh checkout in the working directory
    Fetched,
    /// Release tag resolved to a valid version
    VersionResolved,
    /// Release record already exists; nothing to do
    AlreadyPublished,
    /// Registry confirmed the release is new
    BuildPending,
    /// Binary compiled
    Built,
    /// Digest computed and package compressed
    Packaged,
    /// Package stored
    Uploaded,
    /// Release record created
    Registered,
    /// Current-version pointer updated
    Published,
    Failed,
}

impl TerminalState for PlatformRunState {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlatformRunState::AlreadyPublished
                | PlatformRunState::Published
                | PlatformRunState::Failed
        )
    }
}

impl PlatformRunState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: PlatformRunState) -> bool {
        use PlatformRunState::*;

        if target == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Pending, Fetched)
                | (Fetched, VersionResolved)
                | (VersionResolved, AlreadyPublished)
                | (VersionResolved, BuildPending)
                | (BuildPending, Built)
                | (Built, Packaged)
                | (Packaged, Uploaded)
                | (Uploaded, Registered)
                | (Registered, Published)
        )
    }

    /// Ended without error (published now or earlier)
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            PlatformRunState::Published | PlatformRunState::AlreadyPublished
        )
    }
}

/// One recorded transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub state: PlatformRunState,
    pub at: DateTime<Utc>,
    /// Monotonic sequence counter for ordering
    pub seq: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RunStateError {
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: PlatformRunState,
        to: PlatformRunState,
    },
}

/// Tracks a platform's progress through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformRun {
    pub platform: Platform,
    pub state: PlatformRunState,
    pub history: Vec<StateChange>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlatformRun {
    pub fn new(platform: Platform) -> Self {
        let now = now_utc();
        Self {
            platform,
            state: PlatformRunState::Pending,
            history: vec![StateChange {
                state: PlatformRunState::Pending,
                at: now,
                seq: next_seq(),
            }],
            started_at: now,
            updated_at: now,
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, new_state: PlatformRunState) -> Result<(), RunStateError> {
        if !self.state.can_transition_to(new_state) {
            return Err(RunStateError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        let now = now_utc();
        self.state = new_state;
        self.updated_at = now;
        self.history.push(StateChange {
            state: new_state,
            at: now,
            seq: next_seq(),
        });
        Ok(())
    }

    /// Mark the run failed; a no-op once terminal
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            let _ = self.transition(PlatformRunState::Failed);
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// States visited, in order
    pub fn states(&self) -> Vec<PlatformRunState> {
        self.history.iter().map(|c| c.state).collect()
    }
}
