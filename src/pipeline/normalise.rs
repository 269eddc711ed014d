//! Deterministic cleanup of recognised page text.
//!
//! Tesseract terminates every page with a form feed and keeps the scanner's
//! line endings; vision models sometimes wrap their answer in a code fence
//! or sprinkle zero-width characters. None of that should reach the
//! classifier, whose phrase matching is a plain substring search.
//!
//! Rules run in this order: fences, line endings, form feeds, invisible
//! characters, trailing whitespace, blank-line runs, outer trim.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule to raw recognizer output.
pub fn normalise_text(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    let s = s.replace('\u{000C}', "\n");
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Outer fences ─────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Line endings ─────────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Invisible characters ─────────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .replace(
            [
                '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
            ],
            "",
        )
        .replace('\u{00A0}', " ")
}

// ── Whitespace ───────────────────────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tesseract_form_feed_is_removed() {
        let raw = "Certificate of Analysis\nLot 7\n\n\u{000C}";
        assert_eq!(normalise_text(raw), "Certificate of Analysis\nLot 7");
    }

    #[test]
    fn crlf_is_normalised() {
        assert_eq!(normalise_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn fences_are_stripped() {
        let raw = "```text\nPILOT\nQuotation No. : Q1\n```";
        assert_eq!(normalise_text(raw), "PILOT\nQuotation No. : Q1");
        let raw = "```\nPILOT\n```\n";
        assert_eq!(normalise_text(raw), "PILOT");
    }

    #[test]
    fn inner_fences_are_kept() {
        let raw = "intro\n```\ncode\n```";
        assert_eq!(normalise_text(raw), raw);
    }

    #[test]
    fn invisible_chars_are_removed() {
        assert_eq!(
            normalise_text("PI\u{200B}LOT\u{00A0}report\u{FEFF}"),
            "PILOT report"
        );
    }

    #[test]
    fn blank_runs_collapse() {
        assert_eq!(normalise_text("a  \n\n\n\n\nb\t\n"), "a\n\nb");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalise_text(""), "");
        assert_eq!(normalise_text("\u{000C}"), "");
        assert_eq!(normalise_text("   \n \n"), "");
    }

    #[test]
    fn labels_survive_cleanup() {
        let raw = "PILOT\r\nQuotation No. : QB1234\r\nVersion : 2\r\n\u{000C}";
        let clean = normalise_text(raw);
        assert_eq!(
            crate::fields::extract_key(&clean),
            Some(crate::fields::GroupKey::new("QB1234", "2"))
        );
    }
}
