//! Test doubles for external collaborators
//!
//! - [`MockRunner`]: scripted git/toolchain commands with filesystem side
//!   effects and a call log
//! - [`MockServer`]: in-memory registry and content store implementing
//!   [`Transport`](crate::transport::Transport)
//! - [`FailureInjector`]: forced statuses or transport errors per request
//!   kind, optionally limited to the first N calls
//!
//! Public so integration tests can drive the whole pipeline without git,
//! a compiler, or a network.

mod failure;
mod runner;
mod server;

pub use failure::{FailureConfig, FailureInjector, FailureKind, MockOp};
pub use runner::{MockResponse, MockRunner};
pub use server::MockServer;
