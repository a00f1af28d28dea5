//! Failure injection for the mock server
//!
//! Forces a chosen HTTP status or a transport error on one kind of
//! request, optionally only for the first N attempts.

use std::collections::HashMap;

/// Request kinds the mock server distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    /// Any GET (release lookup, pointer read)
    Get,
    /// Blob PUT to content storage
    Upload,
    /// Release record PUT
    Register,
    /// Current-version pointer PUT
    SetPointer,
}

/// What an injected failure looks like
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Respond with this status and a short body
    Status(u16),
    /// Fail without a response
    Transport(String),
}

/// Failure configuration for an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureConfig {
    pub kind: FailureKind,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    pub fn status(status: u16) -> Self {
        Self {
            kind: FailureKind::Status(status),
            fail_count: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport(message.into()),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

/// Per-operation failure table
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<MockOp, FailureConfig>,
    call_counts: HashMap<MockOp, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, op: MockOp, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    pub fn clear_op(&mut self, op: MockOp) {
        self.configs.remove(&op);
        self.call_counts.remove(&op);
    }

    /// Failure to apply to this call of `op`, if any
    pub fn check(&mut self, op: MockOp) -> Option<FailureKind> {
        let config = self.configs.get(&op)?;
        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;

        if let Some(limit) = config.fail_count {
            if *count > limit {
                return None;
            }
        }
        Some(config.kind.clone())
    }
}
