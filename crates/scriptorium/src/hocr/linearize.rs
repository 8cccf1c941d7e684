//! Plain-text rendering of a parsed hOCR document.
//!
//! Each line becomes its words joined by a single space plus `\n`; each
//! paragraph is followed by one extra `\n`. Nothing is trimmed or appended
//! after the last paragraph, so `["the cat", "sat down"]` renders as
//! `"the cat\nsat down\n\n"`.
//!
//! The same emitter drives both an in-memory `String` and any
//! [`std::io::Write`] sink, so the two output modes are byte-identical.
use super::types::HocrDocument;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// How extracted text is produced before it is handed to the materializer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Build one complete string in memory.
    #[default]
    Buffered,
    /// Write incrementally to a byte sink.
    Streamed,
}

trait TextSink {
    fn push_text(&mut self, text: &str) -> io::Result<()>;
}

impl TextSink for String {
    fn push_text(&mut self, text: &str) -> io::Result<()> {
        self.push_str(text);
        Ok(())
    }
}

struct WriteSink<W: Write>(W);

impl<W: Write> TextSink for WriteSink<W> {
    fn push_text(&mut self, text: &str) -> io::Result<()> {
        self.0.write_all(text.as_bytes())
    }
}

fn emit<S: TextSink>(document: &HocrDocument, sink: &mut S) -> io::Result<()> {
    for paragraph in &document.paragraphs {
        for line in &paragraph.lines {
            for (index, word) in line.words.iter().enumerate() {
                if index > 0 {
                    sink.push_text(" ")?;
                }
                sink.push_text(word)?;
            }
            sink.push_text("\n")?;
        }
        sink.push_text("\n")?;
    }
    Ok(())
}

/// Render the document into a single string.
pub fn linearize(document: &HocrDocument) -> String {
    let mut text = String::new();
    // Pushing into a String cannot fail.
    let _ = emit(document, &mut text);
    text
}

/// Stream the rendered text into `writer`, flushing at the end.
///
/// I/O errors from the writer bubble up as `ScriptoriumError::Io`.
pub fn write_linearized<W: Write>(document: &HocrDocument, writer: W) -> Result<()> {
    let mut sink = WriteSink(writer);
    emit(document, &mut sink)?;
    sink.0.flush()?;
    Ok(())
}

/// Render the document to bytes using the requested mode.
pub fn render(document: &HocrDocument, mode: OutputMode) -> Result<Vec<u8>> {
    match mode {
        OutputMode::Buffered => Ok(linearize(document).into_bytes()),
        OutputMode::Streamed => {
            let mut buffer = Vec::new();
            write_linearized(document, &mut buffer)?;
            Ok(buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hocr::types::{HocrLine, HocrParagraph};

    fn paragraph(lines: &[&[&str]]) -> HocrParagraph {
        HocrParagraph {
            lines: lines.iter().map(|words| HocrLine::new(words.iter().copied())).collect(),
        }
    }

    #[test]
    fn test_single_paragraph_two_lines() {
        let doc = HocrDocument {
            paragraphs: vec![paragraph(&[&["the", "cat"], &["sat", "down"]])],
        };
        assert_eq!(linearize(&doc), "the cat\nsat down\n\n");
    }

    #[test]
    fn test_paragraphs_separated_by_one_blank_line() {
        let doc = HocrDocument {
            paragraphs: vec![paragraph(&[&["first"]]), paragraph(&[&["second"]])],
        };
        let text = linearize(&doc);
        assert_eq!(text, "first\n\nsecond\n\n");
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn test_empty_document_renders_empty() {
        assert_eq!(linearize(&HocrDocument::default()), "");
    }

    #[test]
    fn test_line_without_words_is_blank_line() {
        let doc = HocrDocument {
            paragraphs: vec![paragraph(&[&[], &["after"]])],
        };
        assert_eq!(linearize(&doc), "\nafter\n\n");
    }

    #[test]
    fn test_streamed_matches_buffered() {
        let doc = HocrDocument {
            paragraphs: vec![
                paragraph(&[&["Ñoño", "日本語"], &["العربية"]]),
                paragraph(&[&["a", "b", "c"]]),
            ],
        };
        let buffered = render(&doc, OutputMode::Buffered).unwrap();
        let streamed = render(&doc, OutputMode::Streamed).unwrap();
        assert_eq!(buffered, streamed);
        assert_eq!(String::from_utf8(streamed).unwrap(), linearize(&doc));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_errors_bubble_up() {
        let doc = HocrDocument {
            paragraphs: vec![paragraph(&[&["x"]])],
        };
        let result = write_linearized(&doc, FailingWriter);
        assert!(matches!(result, Err(crate::ScriptoriumError::Io(_))));
    }
}
