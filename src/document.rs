//! In-memory model of one recognised input document.
//!
//! A [`Document`] lives only for the duration of one processing run: it is
//! built from the recognised text of every page, grouped, planned, and then
//! dropped.

use crate::classify::{classify, PageCategory};
use crate::fields::{extract_key, GroupKey};
use crate::output::PageRecord;
use std::path::{Path, PathBuf};

/// One page of an input document with its derived category and key.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Zero-based position in the source document.
    pub index: usize,
    /// Recognised text, possibly empty.
    pub text: String,
    pub category: PageCategory,
    pub key: Option<GroupKey>,
}

impl Page {
    /// Build a page, deriving its category and key from `text`.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            index,
            category: classify(&text),
            key: extract_key(&text),
            text,
        }
    }

    /// 1-based page number, as used by the external tools.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }

    pub fn record(&self) -> PageRecord {
        PageRecord {
            page_num: self.page_num(),
            category: self.category,
            key: self.key.clone(),
            text_len: self.text.len(),
        }
    }
}

/// One input file and its ordered pages.
///
/// Page indices are contiguous and zero-based: `pages[i].index == i`.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    pages: Vec<Page>,
}

impl Document {
    /// Build a document from per-page texts in source order.
    pub fn from_texts<I, S>(path: impl Into<PathBuf>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Page::new(index, text))
            .collect();
        Self {
            path: path.into(),
            pages,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_records(&self) -> Vec<PageRecord> {
        self.pages.iter().map(Page::record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_indexed_in_order() {
        let doc = Document::from_texts("scan.pdf", ["a", "b", "c"]);
        assert_eq!(doc.page_count(), 3);
        for (i, page) in doc.pages().iter().enumerate() {
            assert_eq!(page.index, i);
            assert_eq!(page.page_num(), i + 1);
        }
        assert_eq!(doc.path(), Path::new("scan.pdf"));
    }

    #[test]
    fn page_derives_category_and_key() {
        let page = Page::new(4, "PILOT\nQuotation No. : QB1234\nVersion : 2");
        assert_eq!(page.category, PageCategory::KeyedCandidate);
        assert_eq!(page.key, Some(GroupKey::new("QB1234", "2")));
    }

    #[test]
    fn empty_page_has_no_key() {
        let page = Page::new(0, "");
        assert_eq!(page.category, PageCategory::Unclassified);
        assert_eq!(page.key, None);
    }

    #[test]
    fn marker_page_can_carry_a_key() {
        let page = Page::new(0, "Certificate of Analysis\nQuotation No. : Q5");
        assert_eq!(page.category, PageCategory::RunMarker);
        assert_eq!(page.key, Some(GroupKey::new("Q5", "1")));
    }

    #[test]
    fn records_use_page_numbers() {
        let doc = Document::from_texts("scan.pdf", vec![String::new(), "PILOT".to_string()]);
        let records = doc.page_records();
        assert_eq!(records[0].page_num, 1);
        assert_eq!(records[1].page_num, 2);
        assert_eq!(records[1].category, PageCategory::KeyedCandidate);
        assert_eq!(records[1].text_len, 5);
    }

    #[test]
    fn empty_document() {
        let doc = Document::from_texts("empty.pdf", Vec::<String>::new());
        assert_eq!(doc.page_count(), 0);
        assert!(doc.page_records().is_empty());
    }
}
