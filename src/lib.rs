//! distkit - build, fingerprint and publish versioned binaries
//!
//! For each requested platform distkit clones the release branch, derives
//! the version from the latest `v`-prefixed tag, skips the platform if the
//! registry already has that release, and otherwise cross-compiles,
//! packages and publishes it: upload the gzip package, create the immutable
//! release record, then move the platform's current-version pointer.

pub mod build;
pub mod config;
pub mod credentials;
pub mod logging;
pub mod mock;
pub mod package;
pub mod pipeline;
pub mod pointer;
pub mod publish;
pub mod registry;
pub mod runner;
pub mod source;
pub mod state;
pub mod summary;
pub mod transport;
pub mod version;

pub use config::{ConfigError, DistConfig, EffectiveConfig};
pub use pipeline::{resolve_platforms, BuildRequest, Pipeline, PipelineError, Stage};
pub use pointer::{PointerError, PointerOps};
pub use summary::{BatchSummary, ExitCode, OutcomeStatus, PlatformOutcome};

pub use distkit_protocol::{CurrentVersionPointer, Platform, ReleaseKey, ReleaseRecord};
