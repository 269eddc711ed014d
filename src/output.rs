//! Result types returned by the splitting pipeline.
//!
//! Everything here is `Serialize + Deserialize` so the CLI can emit a run
//! summary as JSON and callers can persist or diff runs.

use crate::classify::PageCategory;
use crate::error::GroupError;
use crate::fields::GroupKey;
use crate::planner::WritePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What was recognised on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-indexed page number.
    pub page_num: usize,
    pub category: PageCategory,
    pub key: Option<GroupKey>,
    /// Byte length of the recognised text (0 for blank pages).
    pub text_len: usize,
}

/// Which partition an output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Run,
    Keyed,
}

/// What happened to one planned output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutputStatus {
    /// The output file was written.
    Written,
    /// The output was not written because the target already exists or
    /// another group of the same plan claimed it.
    Skipped { reason: String },
    /// Dry run: the output would have been written.
    Planned,
    /// Writing failed; the output is missing.
    Failed { error: GroupError },
}

impl OutputStatus {
    pub fn is_written(&self) -> bool {
        matches!(self, OutputStatus::Written)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, OutputStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, OutputStatus::Failed { .. })
    }
}

/// Outcome for one group of one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupOutcome {
    pub kind: GroupKind,
    /// Human-readable description, e.g. `run #2 (pages 5-7)`.
    pub label: String,
    /// 1-indexed source pages, in output order.
    pub pages: Vec<usize>,
    pub target: PathBuf,
    pub policy: WritePolicy,
    #[serde(flatten)]
    pub status: OutputStatus,
}

/// Timing and output counters for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStats {
    pub page_count: usize,
    pub run_groups: usize,
    pub keyed_groups: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub recognition_duration_ms: u64,
    pub extraction_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Successful processing of one document.
///
/// "Successful" means every page was recognised; individual outputs may
/// still have been skipped or failed (see [`GroupOutcome::status`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitOutcome {
    pub source: PathBuf,
    pub pages: Vec<PageRecord>,
    pub outputs: Vec<GroupOutcome>,
    pub stats: DocumentStats,
}

/// Per-document entry of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source: PathBuf,
    /// Present when the document was processed to completion.
    pub outcome: Option<SplitOutcome>,
    /// Reason the document was aborted, if it was.
    pub error: Option<String>,
}

impl DocumentReport {
    pub fn succeeded(source: PathBuf, outcome: SplitOutcome) -> Self {
        Self {
            source,
            outcome: Some(outcome),
            error: None,
        }
    }

    pub fn failed(source: PathBuf, error: impl ToString) -> Self {
        Self {
            source,
            outcome: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Totals across a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_documents: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outputs_written: usize,
    pub outputs_skipped: usize,
    pub outputs_planned: usize,
    pub outputs_failed: usize,
    pub total_duration_ms: u64,
}

/// Result of processing every document found in the input directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// One entry per input document, sorted by source path.
    pub documents: Vec<DocumentReport>,
    pub stats: BatchStats,
}

impl BatchSummary {
    /// Build a summary from reports in any order.
    pub fn from_reports(mut documents: Vec<DocumentReport>, total_duration_ms: u64) -> Self {
        documents.sort_by(|a, b| a.source.cmp(&b.source));

        let mut stats = BatchStats {
            total_documents: documents.len(),
            total_duration_ms,
            ..Default::default()
        };
        for report in &documents {
            match report.outcome {
                Some(ref outcome) if report.is_success() => {
                    stats.succeeded += 1;
                    for output in &outcome.outputs {
                        match output.status {
                            OutputStatus::Written => stats.outputs_written += 1,
                            OutputStatus::Skipped { .. } => stats.outputs_skipped += 1,
                            OutputStatus::Planned => stats.outputs_planned += 1,
                            OutputStatus::Failed { .. } => stats.outputs_failed += 1,
                        }
                    }
                }
                _ => stats.failed += 1,
            }
        }

        Self { documents, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(source: &str, statuses: Vec<OutputStatus>) -> SplitOutcome {
        SplitOutcome {
            source: PathBuf::from(source),
            pages: vec![],
            outputs: statuses
                .into_iter()
                .map(|status| GroupOutcome {
                    kind: GroupKind::Keyed,
                    label: "quotation Q1 v1".into(),
                    pages: vec![1],
                    target: PathBuf::from("/out/QB-Q1/PilotReport_V1.pdf"),
                    policy: WritePolicy::SkipIfExists,
                    status,
                })
                .collect(),
            stats: DocumentStats::default(),
        }
    }

    #[test]
    fn summary_counts_outputs_and_failures() {
        let reports = vec![
            DocumentReport::failed(PathBuf::from("b.pdf"), "OCR failed"),
            DocumentReport::succeeded(
                PathBuf::from("a.pdf"),
                outcome(
                    "a.pdf",
                    vec![
                        OutputStatus::Written,
                        OutputStatus::Skipped {
                            reason: "exists".into(),
                        },
                        OutputStatus::Failed {
                            error: GroupError::PersistFailed {
                                path: PathBuf::from("/out/x.pdf"),
                                detail: "disk full".into(),
                            },
                        },
                    ],
                ),
            ),
        ];

        let summary = BatchSummary::from_reports(reports, 42);
        assert_eq!(summary.stats.total_documents, 2);
        assert_eq!(summary.stats.succeeded, 1);
        assert_eq!(summary.stats.failed, 1);
        assert_eq!(summary.stats.outputs_written, 1);
        assert_eq!(summary.stats.outputs_skipped, 1);
        assert_eq!(summary.stats.outputs_failed, 1);
        assert_eq!(summary.stats.total_duration_ms, 42);
        // Sorted by source path.
        assert_eq!(summary.documents[0].source, PathBuf::from("a.pdf"));
    }

    #[test]
    fn group_outcome_serialises_flat_status() {
        let out = outcome(
            "a.pdf",
            vec![OutputStatus::Skipped {
                reason: "target exists".into(),
            }],
        );
        let json = serde_json::to_value(&out.outputs[0]).expect("serialise");
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "target exists");
        assert_eq!(json["kind"], "keyed");
        assert_eq!(json["policy"], "skip_if_exists");
    }

    #[test]
    fn report_round_trips() {
        let report = DocumentReport::succeeded(
            PathBuf::from("a.pdf"),
            outcome("a.pdf", vec![OutputStatus::Planned]),
        );
        let json = serde_json::to_string(&report).expect("serialise");
        let back: DocumentReport = serde_json::from_str(&json).expect("deserialise");
        assert!(back.is_success());
        let outputs = back.outcome.expect("outcome").outputs;
        assert!(matches!(outputs[0].status, OutputStatus::Planned));
    }
}
