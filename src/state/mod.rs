//! Per-platform run state machine
//!
//! `Pending → Fetched → VersionResolved → (AlreadyPublished | BuildPending)
//! → Built → Packaged → Uploaded → Registered → Published`
//!
//! Any non-terminal state can move to `Failed`.

mod platform_run;

pub use platform_run::{PlatformRun, PlatformRunState, RunStateError, StateChange};

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global sequence counter for ordering events within a single process
static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Get the next sequence number for ordering
pub fn next_seq() -> u64 {
    SEQUENCE_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Current UTC timestamp
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Check if a state is terminal (no further transitions possible)
pub trait TerminalState {
    fn is_terminal(&self) -> bool;
}
