//! Run outcome classification and operator-facing reporting.
//!
//! The run terminates in exactly one of three states: success, integrity
//! failure (the target store rejected a write on a constraint) or generic
//! failure. Operators schedule this job unattended, so the distinction
//! between data problems and system problems must survive into the terminal
//! report and the process exit code.

use chrono::{DateTime, Utc};

use crate::error::{ErrorKind, SyncError};
use crate::sync::SyncSummary;

/// Terminal classification of a consolidation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// All protocol steps completed.
    Success,
    /// The target store rejected a write due to a constraint violation.
    IntegrityFailure,
    /// Any other failure: network, parsing, type coercion, configuration.
    Failure,
}

impl RunOutcome {
    /// Returns true for a successful run.
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    /// Maps the outcome to the process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Failure => 1,
            RunOutcome::IntegrityFailure => 2,
        }
    }
}

/// Operator-facing report of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-step row counts, present on success.
    pub summary: Option<SyncSummary>,
}

impl RunReport {
    /// Classifies a finished run and builds its report.
    pub fn classify(
        started_at: DateTime<Utc>,
        result: &Result<SyncSummary, SyncError>,
    ) -> RunReport {
        let finished_at = Utc::now();

        match result {
            Ok(summary) => RunReport {
                outcome: RunOutcome::Success,
                message: format!(
                    "consolidation completed: {} rule sets staged, {} updated, {} inserted, {} backed up",
                    summary.staged, summary.updated, summary.inserted, summary.backed_up
                ),
                started_at,
                finished_at,
                summary: Some(*summary),
            },
            Err(error) if error.kind() == ErrorKind::IntegrityViolation => RunReport {
                outcome: RunOutcome::IntegrityFailure,
                message: format!("integrity violation reported by the rule store: {error}"),
                started_at,
                finished_at,
                summary: None,
            },
            Err(error) => RunReport {
                outcome: RunOutcome::Failure,
                message: format!("consolidation run failed: {error}"),
                started_at,
                finished_at,
                summary: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_error;

    #[test]
    fn success_report_carries_the_summary() {
        let summary = SyncSummary {
            staged: 3,
            updated: 1,
            inserted: 2,
            backed_up: 3,
            ..SyncSummary::default()
        };

        let report = RunReport::classify(Utc::now(), &Ok(summary));

        assert!(report.outcome.is_success());
        assert_eq!(report.outcome.exit_code(), 0);
        assert_eq!(report.summary, Some(summary));
        assert!(report.message.contains("3 rule sets staged"));
    }

    #[test]
    fn integrity_violations_are_classified_distinctly() {
        let error = sync_error!(
            ErrorKind::IntegrityViolation,
            "Postgres constraint violation"
        );

        let report = RunReport::classify(Utc::now(), &Err(error));

        assert_eq!(report.outcome, RunOutcome::IntegrityFailure);
        assert_eq!(report.outcome.exit_code(), 2);
        assert!(report.message.contains("integrity violation"));
    }

    #[test]
    fn any_other_error_is_a_generic_failure() {
        let error = sync_error!(ErrorKind::SourceQueryFailed, "BigQuery response error");

        let report = RunReport::classify(Utc::now(), &Err(error));

        assert_eq!(report.outcome, RunOutcome::Failure);
        assert_eq!(report.outcome.exit_code(), 1);
    }
}
