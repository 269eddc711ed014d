//! Page classification from recognised text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phrases that open a new run (certificate / specification sheet).
pub const RUN_MARKER_PHRASES: [&str; 2] = ["Certificate of Analysis", "Specification Sheet"];

/// Phrases that flag a pilot report page.
pub const KEYED_CANDIDATE_PHRASES: [&str; 1] = ["PILOT"];

/// Coarse category of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageCategory {
    /// Starts a new run group.
    RunMarker,
    /// Looks like a pilot report page. Grouping still depends on the
    /// quotation number being readable.
    KeyedCandidate,
    Unclassified,
}

impl fmt::Display for PageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageCategory::RunMarker => "run-marker",
            PageCategory::KeyedCandidate => "keyed-candidate",
            PageCategory::Unclassified => "unclassified",
        };
        f.write_str(s)
    }
}

/// Classify a page. Run markers take precedence over keyed candidates.
pub fn classify(text: &str) -> PageCategory {
    if RUN_MARKER_PHRASES.iter().any(|p| text.contains(p)) {
        PageCategory::RunMarker
    } else if KEYED_CANDIDATE_PHRASES.iter().any(|p| text.contains(p)) {
        PageCategory::KeyedCandidate
    } else {
        PageCategory::Unclassified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificate_is_marker() {
        assert_eq!(
            classify("ACME Labs\nCertificate of Analysis\nLot 42"),
            PageCategory::RunMarker
        );
    }

    #[test]
    fn specification_sheet_is_marker() {
        assert_eq!(classify("Specification Sheet"), PageCategory::RunMarker);
    }

    #[test]
    fn marker_wins_over_pilot() {
        assert_eq!(
            classify("PILOT batch\nCertificate of Analysis"),
            PageCategory::RunMarker
        );
        assert_eq!(
            classify("Specification Sheet for PILOT run"),
            PageCategory::RunMarker
        );
    }

    #[test]
    fn pilot_is_keyed_candidate() {
        assert_eq!(
            classify("PILOT REPORT\nQuotation No. : Q9"),
            PageCategory::KeyedCandidate
        );
    }

    #[test]
    fn pilot_without_quotation_is_still_candidate() {
        assert_eq!(classify("PILOT"), PageCategory::KeyedCandidate);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(classify("pilot plant"), PageCategory::Unclassified);
        assert_eq!(
            classify("certificate of analysis"),
            PageCategory::Unclassified
        );
    }

    #[test]
    fn empty_text_is_unclassified() {
        assert_eq!(classify(""), PageCategory::Unclassified);
    }
}
