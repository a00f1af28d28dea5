//! Batch results and exit codes
//!
//! One [`PlatformOutcome`] per requested platform, aggregated into a
//! [`BatchSummary`] that `distkit build` prints or writes with `--summary`.

mod batch;
mod exit;
mod outcome;

pub use batch::BatchSummary;
pub use exit::ExitCode;
pub use outcome::{OutcomeStatus, PlatformOutcome};
