use serde::{Deserialize, Serialize};

/// Parsed hOCR document: paragraphs of lines of words, in document order.
///
/// Only paragraphs that contain at least one `ocr_line` are present; the
/// tree is built once per parse and discarded after linearization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HocrDocument {
    pub paragraphs: Vec<HocrParagraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HocrParagraph {
    pub lines: Vec<HocrLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HocrLine {
    pub words: Vec<String>,
}

impl HocrDocument {
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.lines.len()).sum()
    }

    pub fn word_count(&self) -> usize {
        self.paragraphs
            .iter()
            .flat_map(|p| p.lines.iter())
            .map(|l| l.words.len())
            .sum()
    }
}

impl HocrLine {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}
