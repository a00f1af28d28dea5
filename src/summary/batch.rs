//! Batch summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use super::exit::ExitCode;
use super::outcome::{OutcomeStatus, PlatformOutcome};

/// Schema identifier for the summary document
pub const SUMMARY_SCHEMA_ID: &str = "distkit/batch_summary@1";

/// Aggregated result of a `distkit build` invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub schema_id: String,

    /// ULID of this batch
    pub run_id: String,

    pub artifact: String,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    pub outcomes: Vec<PlatformOutcome>,

    pub published: usize,

    pub already_published: usize,

    pub failed: usize,

    pub exit_code: i32,

    /// Human-readable summary
    pub human_summary: String,
}

impl BatchSummary {
    pub fn from_outcomes(
        run_id: String,
        artifact: String,
        started_at: DateTime<Utc>,
        outcomes: Vec<PlatformOutcome>,
    ) -> Self {
        let count = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status == status).count();
        let published = count(OutcomeStatus::Published);
        let already_published = count(OutcomeStatus::AlreadyPublished);
        let failed = count(OutcomeStatus::Failed);

        let exit_code = if failed > 0 {
            ExitCode::PlatformFailed
        } else {
            ExitCode::Success
        };

        let human_summary = if outcomes.is_empty() {
            "No platforms requested".to_string()
        } else if failed == 0 {
            format!(
                "{}: {} published, {} already published",
                artifact, published, already_published
            )
        } else {
            let names: Vec<String> = outcomes
                .iter()
                .filter(|o| o.status.is_failure())
                .map(|o| o.platform.to_string())
                .collect();
            format!(
                "{}: {} published, {} already published, {} failed ({})",
                artifact,
                published,
                already_published,
                failed,
                names.join(", ")
            )
        };

        Self {
            schema_id: SUMMARY_SCHEMA_ID.to_string(),
            run_id,
            artifact,
            started_at,
            finished_at: Utc::now(),
            outcomes,
            published,
            already_published,
            failed,
            exit_code: exit_code.as_i32(),
            human_summary,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_i32(self.exit_code).unwrap_or(ExitCode::PlatformFailed)
    }

    pub fn outcome(&self, platform: &str) -> Option<&PlatformOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.platform.to_string() == platform)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{PlatformRun, PlatformRunState};

    fn outcome(platform: &str, status: OutcomeStatus) -> PlatformOutcome {
        let run = PlatformRun::new(platform.parse().unwrap());
        PlatformOutcome {
            platform: run.platform.clone(),
            status,
            final_state: match status {
                OutcomeStatus::Published => PlatformRunState::Published,
                OutcomeStatus::AlreadyPublished => PlatformRunState::AlreadyPublished,
                OutcomeStatus::Failed => PlatformRunState::Failed,
            },
            version: Some("1.2.3".to_string()),
            sha256: None,
            stage: None,
            message: None,
            history: run.history,
            duration_ms: 5,
        }
    }

    #[test]
    fn test_all_published() {
        let summary = BatchSummary::from_outcomes(
            "01J0000000000000000000000".to_string(),
            "widget".to_string(),
            Utc::now(),
            vec![
                outcome("linux-amd64", OutcomeStatus::Published),
                outcome("darwin-amd64", OutcomeStatus::AlreadyPublished),
            ],
        );
        assert_eq!(summary.exit_code(), ExitCode::Success);
        assert_eq!(summary.published, 1);
        assert_eq!(summary.already_published, 1);
        assert_eq!(summary.human_summary, "widget: 1 published, 1 already published");
    }

    #[test]
    fn test_any_failure_is_exit_3() {
        let summary = BatchSummary::from_outcomes(
            "run".to_string(),
            "widget".to_string(),
            Utc::now(),
            vec![
                outcome("linux-amd64", OutcomeStatus::Failed),
                outcome("linux-386", OutcomeStatus::Published),
            ],
        );
        assert_eq!(summary.exit_code, 3);
        assert_eq!(summary.failed, 1);
        assert!(summary.human_summary.ends_with("1 failed (linux-amd64)"));
        assert_eq!(
            summary.outcome("linux-386").unwrap().status,
            OutcomeStatus::Published
        );
    }

    #[test]
    fn test_json_shape() {
        let summary = BatchSummary::from_outcomes(
            "run".to_string(),
            "widget".to_string(),
            Utc::now(),
            vec![outcome("linux-amd64", OutcomeStatus::AlreadyPublished)],
        );
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"status\": \"already_published\""));
        assert!(json.contains("\"final_state\": \"ALREADY_PUBLISHED\""));
        assert!(!json.contains("\"sha256\""));
    }

    #[test]
    fn test_write_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("summary.json");
        let summary =
            BatchSummary::from_outcomes("run".to_string(), "widget".to_string(), Utc::now(), vec![]);
        summary.write_to_file(&path).unwrap();

        let parsed: BatchSummary =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.human_summary, "No platforms requested");
        assert_eq!(parsed.exit_code(), ExitCode::Success);
    }
}
