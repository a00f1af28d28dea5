//! Result of one platform's pipeline run

use serde::{Deserialize, Serialize};

use distkit_protocol::Platform;

use crate::pipeline::{PipelineError, Stage};
use crate::state::{PlatformRun, PlatformRunState, StateChange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Published,
    /// Release record already existed; nothing was built
    AlreadyPublished,
    Failed,
}

impl OutcomeStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeStatus::Failed)
    }

    /// Same spelling as the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Published => "published",
            OutcomeStatus::AlreadyPublished => "already_published",
            OutcomeStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformOutcome {
    pub platform: Platform,
    pub status: OutcomeStatus,
    pub final_state: PlatformRunState,
    /// Resolved version, once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Hex SHA-256 of the binary, once packaged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Stage that stopped the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub history: Vec<StateChange>,
    pub duration_ms: u64,
}

impl PlatformOutcome {
    /// Outcome of a run that reached `Published`
    pub fn published(
        run: &PlatformRun,
        version: String,
        sha256: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            platform: run.platform.clone(),
            status: OutcomeStatus::Published,
            final_state: run.state,
            version: Some(version),
            sha256: Some(sha256),
            stage: None,
            message: None,
            history: run.history.clone(),
            duration_ms,
        }
    }

    /// Outcome of a run that stopped with `error`
    pub fn stopped(
        run: &PlatformRun,
        version: Option<String>,
        sha256: Option<String>,
        error: &PipelineError,
        duration_ms: u64,
    ) -> Self {
        let status = if error.is_failure() {
            OutcomeStatus::Failed
        } else {
            OutcomeStatus::AlreadyPublished
        };
        Self {
            platform: run.platform.clone(),
            status,
            final_state: run.state,
            version,
            sha256,
            stage: Some(error.stage()),
            message: Some(error.to_string()),
            history: run.history.clone(),
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_matches_json() {
        for status in [
            OutcomeStatus::Published,
            OutcomeStatus::AlreadyPublished,
            OutcomeStatus::Failed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
        assert_eq!(OutcomeStatus::AlreadyPublished.as_str(), "already_published");
    }
}
