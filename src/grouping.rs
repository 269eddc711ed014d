//! Group assignment: partition a document's pages into output groups.
//!
//! Two independent partitions are computed over the same page sequence:
//!
//! * **Run groups**: every run-marker page opens a contiguous range that
//!   extends up to the page before the next marker (or the last page).
//!   Pages before the first marker belong to no run.
//! * **Keyed groups**: every page with a readable quotation number joins
//!   the group for its `(identifier, version)` key, wherever it sits in the
//!   document.
//!
//! The partitions are orthogonal: a page may appear in a run group and in a
//! keyed group at the same time.

use crate::classify::PageCategory;
use crate::document::{Document, Page};
use crate::fields::GroupKey;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A contiguous, inclusive range of zero-based page indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunGroup {
    /// 1-based position of this run among the document's runs.
    pub sequence: usize,
    pub start: usize,
    pub end: usize,
}

impl RunGroup {
    /// Zero-based member indices.
    pub fn indices(&self) -> Vec<usize> {
        (self.start..=self.end).collect()
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Pages sharing one `(identifier, version)` key, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedGroup {
    pub key: GroupKey,
    pub indices: Vec<usize>,
}

/// Either kind of group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Group {
    Run(RunGroup),
    Keyed(KeyedGroup),
}

impl Group {
    /// Zero-based member indices in extraction order.
    pub fn indices(&self) -> Vec<usize> {
        match self {
            Group::Run(run) => run.indices(),
            Group::Keyed(keyed) => keyed.indices.clone(),
        }
    }

    /// 1-based page numbers in extraction order.
    pub fn page_numbers(&self) -> Vec<usize> {
        self.indices().into_iter().map(|i| i + 1).collect()
    }

    /// Short human-readable label for logs and reports.
    pub fn label(&self) -> String {
        match self {
            Group::Run(run) => format!("run #{} (pages {}-{})", run.sequence, run.start + 1, run.end + 1),
            Group::Keyed(keyed) => format!("quotation {}", keyed.key),
        }
    }
}

/// Both partitions of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupAssignment {
    pub runs: Vec<RunGroup>,
    pub keyed: Vec<KeyedGroup>,
}

impl GroupAssignment {
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() && self.keyed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.runs.len() + self.keyed.len()
    }

    /// Runs first (in marker order), then keyed groups (in first-seen order).
    pub fn groups(&self) -> impl Iterator<Item = Group> + '_ {
        self.runs
            .iter()
            .copied()
            .map(Group::Run)
            .chain(self.keyed.iter().cloned().map(Group::Keyed))
    }
}

/// Compute both partitions for `document`.
pub fn assign(document: &Document) -> GroupAssignment {
    GroupAssignment {
        runs: run_groups(document.pages()),
        keyed: keyed_groups(document.pages()),
    }
}

/// Split the page sequence at every run-marker page.
pub fn run_groups(pages: &[Page]) -> Vec<RunGroup> {
    let markers: Vec<usize> = pages
        .iter()
        .filter(|p| p.category == PageCategory::RunMarker)
        .map(|p| p.index)
        .collect();

    markers
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = match markers.get(i + 1) {
                Some(&next) => next - 1,
                None => pages.len() - 1,
            };
            RunGroup {
                sequence: i + 1,
                start,
                end,
            }
        })
        .collect()
}

/// Gather pages by their `(identifier, version)` key.
pub fn keyed_groups(pages: &[Page]) -> Vec<KeyedGroup> {
    let mut by_key: IndexMap<&GroupKey, Vec<usize>> = IndexMap::new();
    for page in pages {
        if let Some(ref key) = page.key {
            by_key.entry(key).or_default().push(page.index);
        }
    }

    by_key
        .into_iter()
        .map(|(key, indices)| KeyedGroup {
            key: key.clone(),
            indices,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(texts: &[&str]) -> Document {
        Document::from_texts("scan.pdf", texts.iter().copied())
    }

    const COA: &str = "Certificate of Analysis";

    #[test]
    fn runs_split_at_markers() {
        let d = doc(&["", "", COA, "", "", "Specification Sheet", ""]);
        let runs = run_groups(d.pages());
        assert_eq!(
            runs,
            vec![
                RunGroup { sequence: 1, start: 2, end: 4 },
                RunGroup { sequence: 2, start: 5, end: 6 },
            ]
        );
    }

    #[test]
    fn no_markers_no_runs() {
        for len in 0..6 {
            let texts = vec!["PILOT"; len];
            let d = doc(&texts);
            assert!(run_groups(d.pages()).is_empty(), "len {len}");
        }
    }

    #[test]
    fn adjacent_markers_make_single_page_runs() {
        let d = doc(&[COA, COA, COA]);
        let runs = run_groups(d.pages());
        assert_eq!(runs.len(), 3);
        for (i, run) in runs.iter().enumerate() {
            assert_eq!((run.start, run.end), (i, i));
            assert_eq!(run.len(), 1);
        }
    }

    #[test]
    fn marker_on_last_page() {
        let d = doc(&[COA, "", "", COA]);
        let runs = run_groups(d.pages());
        assert_eq!(runs[0].indices(), vec![0, 1, 2]);
        assert_eq!(runs[1].indices(), vec![3]);
    }

    #[test]
    fn keyed_pages_group_across_gaps() {
        let d = doc(&[
            "",
            "PILOT Quotation No. : QB1234",
            "",
            "",
            "Quotation No. : QB1234",
        ]);
        let keyed = keyed_groups(d.pages());
        assert_eq!(
            keyed,
            vec![KeyedGroup {
                key: GroupKey::new("QB1234", "1"),
                indices: vec![1, 4],
            }]
        );
    }

    #[test]
    fn versions_split_keyed_groups() {
        let d = doc(&[
            "Quotation No. : Q1\nVersion : 2",
            "Quotation No. : Q1",
            "Quotation No. : Q1\nVersion : 2",
            "Quotation No. : Q2",
        ]);
        let keyed = keyed_groups(d.pages());
        assert_eq!(keyed.len(), 3);
        assert_eq!(keyed[0].key, GroupKey::new("Q1", "2"));
        assert_eq!(keyed[0].indices, vec![0, 2]);
        assert_eq!(keyed[1].key, GroupKey::new("Q1", "1"));
        assert_eq!(keyed[1].indices, vec![1]);
        assert_eq!(keyed[2].key, GroupKey::new("Q2", "1"));
    }

    #[test]
    fn explicit_default_version_matches_implicit() {
        let d = doc(&["Quotation No. : Q1\nVersion : 1", "Quotation No. : Q1"]);
        let keyed = keyed_groups(d.pages());
        assert_eq!(keyed.len(), 1);
        assert_eq!(keyed[0].indices, vec![0, 1]);
    }

    #[test]
    fn pilot_without_identifier_is_skipped() {
        let d = doc(&["PILOT", "PILOT Version : 3"]);
        assert!(keyed_groups(d.pages()).is_empty());
    }

    #[test]
    fn empty_document_has_no_groups() {
        let d = doc(&[]);
        let assignment = assign(&d);
        assert!(assignment.is_empty());
        assert_eq!(assignment.len(), 0);
    }

    #[test]
    fn three_page_scenario() {
        let d = doc(&["cover letter", COA, "PILOT\nQuotation No. : Q9"]);
        let assignment = assign(&d);
        assert_eq!(
            assignment.runs,
            vec![RunGroup { sequence: 1, start: 1, end: 2 }]
        );
        assert_eq!(
            assignment.keyed,
            vec![KeyedGroup {
                key: GroupKey::new("Q9", "1"),
                indices: vec![2],
            }]
        );
    }

    #[test]
    fn partitions_may_overlap() {
        let first = format!("{COA}\nQuotation No. : Q3");
        let d = doc(&[first.as_str(), ""]);
        let assignment = assign(&d);
        assert_eq!(assignment.runs[0].indices(), vec![0, 1]);
        assert_eq!(assignment.keyed[0].indices, vec![0]);
    }

    #[test]
    fn groups_list_runs_before_keyed() {
        let d = doc(&["Quotation No. : Q1", COA]);
        let groups: Vec<Group> = assign(&d).groups().collect();
        assert!(matches!(groups[0], Group::Run(_)));
        assert!(matches!(groups[1], Group::Keyed(_)));
        assert_eq!(groups[0].page_numbers(), vec![2]);
        assert_eq!(groups[1].page_numbers(), vec![1]);
    }

    #[test]
    fn labels() {
        let run = Group::Run(RunGroup { sequence: 2, start: 4, end: 6 });
        assert_eq!(run.label(), "run #2 (pages 5-7)");
        let keyed = Group::Keyed(KeyedGroup {
            key: GroupKey::new("QB1", "3"),
            indices: vec![0],
        });
        assert_eq!(keyed.label(), "quotation QB1 v3");
    }
}
