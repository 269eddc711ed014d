//! Prompt for the vision recognizer.
//!
//! The vision recognizer stands in for an OCR engine, so the prompt asks
//! for a verbatim plain-text transcription and nothing else. The
//! classifier matches literal phrases such as `Certificate of Analysis`
//! and `Quotation No. :`, so any "helpful" rewording breaks grouping.
//!
//! Callers can override the default via
//! [`crate::config::SplitterConfig::system_prompt`].

/// Default system prompt for transcribing one scanned page.
pub const DEFAULT_TRANSCRIPTION_PROMPT: &str = r#"You are an OCR engine. Transcribe the text of the scanned page image exactly as printed.

Rules:
1. Output plain text only. No Markdown, no code fences, no commentary.
2. Keep the original spelling, capitalisation and punctuation. Do not correct, translate or summarise.
3. Keep labels and their values together on one line as printed, e.g. "Quotation No. : QB1234" or "Version : 2".
4. Follow the reading order of the page, top to bottom, left to right. Put each printed line on its own line.
5. Transcribe table cells row by row, separated by two spaces.
6. Skip logos, signatures and stamps that contain no legible text.
7. If the page is blank or unreadable, output nothing."#;

/// User-turn text sent with the page image.
pub fn transcription_request(page_num: usize) -> String {
    format!("Transcribe page {page_num}.")
}
