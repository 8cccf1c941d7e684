use super::types::{HocrDocument, HocrLine, HocrParagraph};
use crate::error::{Result, ScriptoriumError};
use roxmltree::{Document, Node, ParsingOptions};

/// Class attribute value marking a text line in hOCR output.
pub const OCR_LINE_CLASS: &str = "ocr_line";

const PARAGRAPH_TAG: &str = "p";
const SPAN_TAG: &str = "span";
const UTF8_BOM: &str = "\u{feff}";

/// Parse hOCR markup into its paragraph/line/word structure.
///
/// - Every `p` element that is not itself nested in another `p` is a paragraph.
/// - Only direct `span` children whose `class` is exactly `ocr_line` are lines;
///   any other class (or none) drops the line and its words.
/// - Every direct `span` child of a line is a word, whatever its class. The
///   word text is the concatenated text of all its descendants, so markup
///   nested inside a word (`<strong>`, `<em>`) still contributes its text.
/// - Paragraphs without element children, or without any accepted line, are
///   omitted.
///
/// Malformed markup fails with `ScriptoriumError::Parsing`; no partial tree
/// is returned.
pub fn parse_hocr(markup: &str) -> Result<HocrDocument> {
    let markup = markup.strip_prefix(UTF8_BOM).unwrap_or(markup);
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(markup, options)?;

    let mut paragraphs = Vec::new();
    let mut dropped_lines = 0usize;

    for node in document.descendants().filter(|n| is_tag(n, PARAGRAPH_TAG)) {
        if node.ancestors().skip(1).any(|a| is_tag(&a, PARAGRAPH_TAG)) {
            continue;
        }
        if !node.children().any(|c| c.is_element()) {
            continue;
        }

        let mut lines = Vec::new();
        for line in node.children().filter(|c| is_tag(c, SPAN_TAG)) {
            if line.attribute("class") != Some(OCR_LINE_CLASS) {
                dropped_lines += 1;
                tracing::trace!(class = ?line.attribute("class"), "skipping non-line span");
                continue;
            }

            let words = line
                .children()
                .filter(|c| is_tag(c, SPAN_TAG))
                .map(|word| element_text(&word))
                .collect();
            lines.push(HocrLine { words });
        }

        if !lines.is_empty() {
            paragraphs.push(HocrParagraph { lines });
        }
    }

    let parsed = HocrDocument { paragraphs };
    tracing::debug!(
        paragraphs = parsed.paragraphs.len(),
        lines = parsed.line_count(),
        words = parsed.word_count(),
        dropped_lines,
        "parsed hOCR document"
    );

    Ok(parsed)
}

/// Parse hOCR from raw bytes, which must be UTF-8.
pub fn parse_hocr_bytes(bytes: &[u8]) -> Result<HocrDocument> {
    let markup = std::str::from_utf8(bytes)
        .map_err(|e| ScriptoriumError::parsing_with_source("hOCR content is not valid UTF-8", e))?;
    parse_hocr(markup)
}

fn is_tag(node: &Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(tag)
}

fn element_text(node: &Node<'_, '_>) -> String {
    node.descendants().filter(|n| n.is_text()).filter_map(|n| n.text()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_paragraph() {
        let hocr = r#"<div class="ocr_page">
            <p class="ocr_par">
                <span class="ocr_line"><span class="ocrx_word">the</span> <span class="ocrx_word">cat</span></span>
                <span class="ocr_line"><span class="ocrx_word">sat</span> <span class="ocrx_word">down</span></span>
            </p>
        </div>"#;

        let doc = parse_hocr(hocr).unwrap();
        assert_eq!(doc.paragraphs.len(), 1);
        assert_eq!(
            doc.paragraphs[0].lines,
            vec![HocrLine::new(["the", "cat"]), HocrLine::new(["sat", "down"])]
        );
    }

    #[test]
    fn test_parse_drops_non_line_spans() {
        let hocr = r#"<body><p>
            <span class="ocrx_line"><span>hidden</span></span>
            <span><span>unclassed</span></span>
            <span class="ocr_line extra"><span>multi</span></span>
            <span class="ocr_line"><span>kept</span></span>
        </p></body>"#;

        let doc = parse_hocr(hocr).unwrap();
        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.paragraphs[0].lines[0].words, vec!["kept"]);
    }

    #[test]
    fn test_parse_skips_childless_paragraphs() {
        let hocr = "<body><p></p><p>bare text</p><p class=\"ocr_par\"/></body>";
        let doc = parse_hocr(hocr).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_parse_skips_paragraph_without_accepted_lines() {
        let hocr = r#"<body><p><span class="ocrx_word">loose</span></p></body>"#;
        let doc = parse_hocr(hocr).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_word_class_is_ignored() {
        let hocr = r#"<p><span class="ocr_line">
            <span class="ocrx_word">a</span><span class="ocrx_cinfo">b</span><span>c</span>
        </span></p>"#;
        let doc = parse_hocr(hocr).unwrap();
        assert_eq!(doc.paragraphs[0].lines[0].words, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_word_text_includes_nested_markup() {
        let hocr = r#"<p><span class="ocr_line"><span class="ocrx_word"><strong>Bold</strong></span> <span>a<em>b</em>c</span></span></p>"#;
        let doc = parse_hocr(hocr).unwrap();
        assert_eq!(doc.paragraphs[0].lines[0].words, vec!["Bold", "abc"]);
    }

    #[test]
    fn test_nested_paragraph_is_not_visited_twice() {
        let hocr = r#"<div><p><span class="ocr_line"><span>outer</span></span>
            <p><span class="ocr_line"><span>inner</span></span></p></p></div>"#;
        let doc = parse_hocr(hocr).unwrap();
        assert_eq!(doc.paragraphs.len(), 1);
        assert_eq!(doc.word_count(), 1);
    }

    #[test]
    fn test_parse_xhtml_with_doctype_and_namespace() {
        let hocr = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN"
    "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en" lang="en">
 <head><title></title><meta name="ocr-system" content="tesseract 5.3.0" /></head>
 <body>
  <div class="ocr_page" id="page_1" title="bbox 0 0 100 100">
   <div class="ocr_carea" id="block_1_1">
    <p class="ocr_par" id="par_1_1" lang="eng">
     <span class="ocr_line" id="line_1_1" title="bbox 1 1 50 10"><span class="ocrx_word" id="word_1_1" title="x_wconf 96">Dear</span> <span class="ocrx_word" id="word_1_2">Sir</span></span>
    </p>
   </div>
  </div>
 </body>
</html>"#;
        let doc = parse_hocr(hocr).unwrap();
        assert_eq!(doc.paragraphs[0].lines[0].words, vec!["Dear", "Sir"]);
    }

    #[test]
    fn test_malformed_markup_fails() {
        let hocr = r#"<div class="ocr_page"><p class="ocr_par"><span class="ocr_line">Unclosed</div>"#;
        let result = parse_hocr(hocr);
        assert!(matches!(result, Err(ScriptoriumError::Parsing { .. })));
    }

    #[test]
    fn test_empty_markup_fails() {
        assert!(matches!(parse_hocr(""), Err(ScriptoriumError::Parsing { .. })));
    }

    #[test]
    fn test_parse_bytes_rejects_invalid_utf8() {
        let result = parse_hocr_bytes(&[0x3c, 0x70, 0xff, 0x3e]);
        assert!(matches!(result, Err(ScriptoriumError::Parsing { .. })));
    }

    #[test]
    fn test_parse_bytes_strips_bom() {
        let mut bytes = "\u{feff}".as_bytes().to_vec();
        bytes.extend_from_slice(br#"<p><span class="ocr_line"><span>x</span></span></p>"#);
        let doc = parse_hocr_bytes(&bytes).unwrap();
        assert_eq!(doc.word_count(), 1);
    }
}
