//! Field extraction: pull the quotation key out of a page's recognised text.
//!
//! Both patterns tolerate any amount of whitespace (including line breaks)
//! around the colon, since OCR output rarely reproduces the original
//! spacing. Matching is case-sensitive and the first occurrence wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version assumed when a page carries a quotation number but no version label.
pub const DEFAULT_VERSION: &str = "1";

static RE_QUOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Quotation No\.\s*:\s*(\w+)").unwrap());

static RE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Version\s*:\s*(\S+)").unwrap());

/// The (identifier, version) pair that keyed pages are grouped by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub identifier: String,
    pub version: String,
}

impl GroupKey {
    pub fn new(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.identifier, self.version)
    }
}

/// First `Quotation No. : <token>` capture, or `None` when the label is absent.
pub fn extract_identifier(text: &str) -> Option<String> {
    RE_QUOTATION
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First `Version : <token>` capture, or [`DEFAULT_VERSION`].
pub fn extract_version(text: &str) -> String {
    RE_VERSION
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_VERSION.to_string())
}

/// The page's grouping key. Only pages with an identifier have one.
pub fn extract_key(text: &str) -> Option<GroupKey> {
    extract_identifier(text).map(|identifier| GroupKey {
        identifier,
        version: extract_version(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_found() {
        assert_eq!(
            extract_identifier("Quotation No. : QB1234"),
            Some("QB1234".to_string())
        );
    }

    #[test]
    fn identifier_absent_without_label() {
        assert_eq!(extract_identifier("Quote number QB1234"), None);
        assert_eq!(extract_identifier(""), None);
    }

    #[test]
    fn identifier_needs_a_token() {
        assert_eq!(extract_identifier("Quotation No. :   "), None);
        assert_eq!(extract_identifier("Quotation No. : --"), None);
    }

    #[test]
    fn identifier_is_case_sensitive() {
        assert_eq!(extract_identifier("QUOTATION NO. : QB1"), None);
        assert_eq!(extract_identifier("quotation no. : QB1"), None);
    }

    #[test]
    fn identifier_tolerates_ocr_spacing() {
        assert_eq!(
            extract_identifier("Quotation No.:QB77\nDate: today"),
            Some("QB77".to_string())
        );
        assert_eq!(
            extract_identifier("Quotation No.   :\n  4411 rest"),
            Some("4411".to_string())
        );
    }

    #[test]
    fn identifier_stops_at_non_word_character() {
        assert_eq!(
            extract_identifier("Quotation No. : QB-1234"),
            Some("QB".to_string())
        );
    }

    #[test]
    fn first_identifier_wins() {
        let text = "Quotation No. : FIRST\n...\nQuotation No. : SECOND";
        assert_eq!(extract_identifier(text), Some("FIRST".to_string()));
    }

    #[test]
    fn version_defaults_to_one() {
        assert_eq!(extract_version("no label here"), "1");
        assert_eq!(extract_version(""), "1");
    }

    #[test]
    fn version_captures_non_whitespace_token() {
        assert_eq!(extract_version("Version : 2b"), "2b");
        assert_eq!(extract_version("Version: 3.1-rc"), "3.1-rc");
        assert_eq!(extract_version("Version : 4 final"), "4");
    }

    #[test]
    fn version_is_case_sensitive() {
        assert_eq!(extract_version("VERSION : 9"), "1");
    }

    #[test]
    fn key_requires_identifier() {
        assert_eq!(extract_key("Version : 2"), None);
        assert_eq!(
            extract_key("PILOT\nQuotation No. : Q9\nVersion : 2"),
            Some(GroupKey::new("Q9", "2"))
        );
        assert_eq!(
            extract_key("Quotation No. : Q9"),
            Some(GroupKey::new("Q9", DEFAULT_VERSION))
        );
    }

    #[test]
    fn key_display() {
        assert_eq!(GroupKey::new("QB1", "2").to_string(), "QB1 v2");
    }
}
