//! hOCR parsing and text linearization.
//!
//! hOCR is HTML-based OCR output: paragraphs (`p`) hold lines
//! (`span.ocr_line`) which hold words (`span.ocrx_word`). This module parses
//! that structure and rebuilds plain text from it.
//!
//! # Example
//!
//! ```rust
//! use scriptorium::hocr::extract_text;
//!
//! # fn example() -> scriptorium::Result<()> {
//! let hocr = r#"<div class="ocr_page"><p class="ocr_par">
//!     <span class="ocr_line"><span class="ocrx_word">the</span> <span class="ocrx_word">cat</span></span>
//!     <span class="ocr_line"><span class="ocrx_word">sat</span> <span class="ocrx_word">down</span></span>
//! </p></div>"#;
//!
//! assert_eq!(extract_text(hocr)?, "the cat\nsat down\n\n");
//! # Ok(())
//! # }
//! ```
pub mod linearize;
pub mod parser;
pub mod types;

pub use linearize::{OutputMode, linearize, render, write_linearized};
pub use parser::{OCR_LINE_CLASS, parse_hocr, parse_hocr_bytes};
pub use types::{HocrDocument, HocrLine, HocrParagraph};

use crate::error::Result;

/// Parse hOCR markup and return its plain text.
pub fn extract_text(markup: &str) -> Result<String> {
    let document = parse_hocr(markup)?;
    Ok(linearize(&document))
}

/// Parse hOCR bytes and render them with the requested output mode.
pub fn extract_bytes(bytes: &[u8], mode: OutputMode) -> Result<Vec<u8>> {
    let document = parse_hocr_bytes(bytes)?;
    render(&document, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_empty_paragraphs_yield_empty_text() {
        let hocr = r#"<div class="ocr_page"><p class="ocr_par"></p><p class="ocr_par">  </p></div>"#;
        assert_eq!(extract_text(hocr).unwrap(), "");
    }

    #[test]
    fn test_non_line_words_never_appear() {
        let hocr = r#"<div>
            <p><span class="ocr_caption"><span>secret</span></span><span class="ocr_line"><span>shown</span></span></p>
        </div>"#;
        let text = extract_text(hocr).unwrap();
        assert!(!text.contains("secret"));
        assert_eq!(text, "shown\n\n");
    }

    #[test]
    fn test_extract_bytes_modes_agree() {
        let hocr = br#"<p><span class="ocr_line"><span>one</span></span></p><!-- trailing -->"#;
        let buffered = extract_bytes(hocr, OutputMode::Buffered).unwrap();
        let streamed = extract_bytes(hocr, OutputMode::Streamed).unwrap();
        assert_eq!(buffered, b"one\n\n");
        assert_eq!(buffered, streamed);
    }
}
