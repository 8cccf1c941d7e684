//! hOCR conversion actions.
//!
//! A conversion reads the parent's hOCR artifact, linearizes it and
//! materializes the text as a derivative under the destination term. The two
//! shipped presets differ only in configuration:
//!
//! | preset      | path                                               | output   |
//! |-------------|----------------------------------------------------|----------|
//! | `plaintext` | `[date:custom:Y]-[date:custom:m]/[node:nid].txt`     | streamed |
//! | `ocr`       | `[date:custom:Y]-[date:custom:m]/[node:nid]_ocr.asc` | buffered |
use crate::config::{ConversionConfig, ScriptoriumConfig};
use crate::error::{Result, ScriptoriumError};
use crate::hocr;
use crate::materialize::{MaterializeRequest, Materializer};
use crate::store::ContentStore;
use crate::template::TemplateContext;
use crate::types::{Artifact, ContentItem};
use crate::vocabulary::{TermVocabulary, require_term};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// One configured hOCR to text conversion.
pub struct HocrConversion {
    config: ConversionConfig,
    scheme: String,
    store: Arc<dyn ContentStore>,
    vocabulary: Arc<dyn TermVocabulary>,
    materializer: Arc<Materializer>,
}

impl HocrConversion {
    pub fn new(
        config: ConversionConfig,
        default_scheme: &str,
        store: Arc<dyn ContentStore>,
        vocabulary: Arc<dyn TermVocabulary>,
        materializer: Arc<Materializer>,
    ) -> Self {
        let scheme = config.scheme_or(default_scheme).to_string();
        Self {
            config,
            scheme,
            store,
            vocabulary,
            materializer,
        }
    }

    /// "Convert HOCR Media to Plain Text Transcript"
    pub fn plaintext(
        config: &ScriptoriumConfig,
        store: Arc<dyn ContentStore>,
        vocabulary: Arc<dyn TermVocabulary>,
        materializer: Arc<Materializer>,
    ) -> Self {
        Self::new(config.plaintext.clone(), &config.default_scheme, store, vocabulary, materializer)
    }

    /// "Convert HOCR to OCR Derivative"
    pub fn ocr(
        config: &ScriptoriumConfig,
        store: Arc<dyn ContentStore>,
        vocabulary: Arc<dyn TermVocabulary>,
        materializer: Arc<Materializer>,
    ) -> Self {
        Self::new(config.ocr.clone(), &config.default_scheme, store, vocabulary, materializer)
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn execute(&self, parent: &ContentItem) -> Result<Artifact> {
        self.execute_at(parent, Utc::now())
    }

    /// Run the conversion with `now` as the template date.
    ///
    /// Nothing is written unless the hOCR term, the hOCR artifact and the
    /// destination term all resolve, the destination path renders, and the
    /// markup parses.
    #[tracing::instrument(skip_all, fields(parent = parent.id, scheme = %self.scheme))]
    pub fn execute_at(&self, parent: &ContentItem, now: DateTime<Utc>) -> Result<Artifact> {
        let hocr_term = require_term(self.vocabulary.as_ref(), &self.config.hocr_term_uri, "HOCR")?;
        let hocr_media = self
            .store
            .find_artifact_with_term(parent, &hocr_term)?
            .ok_or_else(|| ScriptoriumError::precondition(format!("Could not locate HOCR media for item {}", parent.id)))?;
        let destination_term = require_term(self.vocabulary.as_ref(), &self.config.destination_term_uri, "destination")?;

        let context = TemplateContext::new(now)
            .with_node(parent)
            .with_media(&hocr_media)
            .with_term(&destination_term);
        let destination = self.config.path.locator(&self.scheme, &context)?;

        let markup = self.store.read_content(&hocr_media)?;
        let text = hocr::extract_bytes(&markup, self.config.output)?;

        self.materializer.materialize(
            &MaterializeRequest {
                parent,
                artifact_type: &self.config.destination_artifact_type,
                term: &destination_term,
                mime_type: &self.config.mime_type,
                destination: &destination,
                required_source: Some(&hocr_term),
            },
            &text,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EXTRACTED_TEXT_TERM_URI, HOCR_TERM_URI};
    use crate::store::MemoryContentStore;
    use crate::types::Term;
    use crate::vocabulary::MemoryVocabulary;
    use chrono::TimeZone;

    const HOCR: &str = r#"<html><body>
<p class="ocr_par"><span class="ocr_line"><span class="ocrx_word">the</span> <span class="ocrx_word">cat</span></span></p>
</body></html>"#;

    fn hocr_term() -> Term {
        Term {
            id: 1,
            name: "hOCR".to_string(),
            uri: HOCR_TERM_URI.to_string(),
        }
    }

    fn text_term() -> Term {
        Term {
            id: 2,
            name: "Extracted Text".to_string(),
            uri: EXTRACTED_TEXT_TERM_URI.to_string(),
        }
    }

    fn conversion(store: &Arc<MemoryContentStore>, ocr: bool) -> HocrConversion {
        let config = ScriptoriumConfig::default();
        let vocabulary = Arc::new(MemoryVocabulary::from_terms([hocr_term(), text_term()]));
        let materializer = Arc::new(Materializer::new(store.clone()));
        if ocr {
            HocrConversion::ocr(&config, store.clone(), vocabulary, materializer)
        } else {
            HocrConversion::plaintext(&config, store.clone(), vocabulary, materializer)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_plaintext_conversion() {
        let store = Arc::new(MemoryContentStore::new());
        let parent = ContentItem::new(7, "Letter");
        store.add_item(parent.clone());
        store.attach(7, "file", &hocr_term(), "text/html", "public://7.hocr", HOCR);

        let artifact = conversion(&store, false).execute_at(&parent, now()).unwrap();
        assert_eq!(artifact.locator.as_deref(), Some("public://2024-03/7.txt"));
        assert_eq!(artifact.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(artifact.term_id, 2);
        assert_eq!(store.content_of(artifact.id).unwrap(), b"the cat\n\n");
    }

    #[test]
    fn test_ocr_conversion_path() {
        let store = Arc::new(MemoryContentStore::new());
        let parent = ContentItem::new(7, "Letter");
        store.add_item(parent.clone());
        store.attach(7, "file", &hocr_term(), "text/html", "public://7.hocr", HOCR);

        let artifact = conversion(&store, true).execute_at(&parent, now()).unwrap();
        assert_eq!(artifact.locator.as_deref(), Some("public://2024-03/7_ocr.asc"));
    }

    #[test]
    fn test_missing_hocr_media() {
        let store = Arc::new(MemoryContentStore::new());
        let parent = ContentItem::new(8, "Empty");
        store.add_item(parent.clone());

        let err = conversion(&store, false).execute_at(&parent, now()).unwrap_err();
        assert_eq!(err.to_string(), "Precondition missing: Could not locate HOCR media for item 8");
        assert!(store.artifacts_of(8).is_empty());
    }

    #[test]
    fn test_malformed_hocr_writes_nothing() {
        let store = Arc::new(MemoryContentStore::new());
        let parent = ContentItem::new(9, "Broken");
        store.add_item(parent.clone());
        store.attach(9, "file", &hocr_term(), "text/html", "public://9.hocr", "<p><span>");

        let err = conversion(&store, false).execute_at(&parent, now()).unwrap_err();
        assert!(matches!(err, ScriptoriumError::Parsing { .. }));
        assert_eq!(store.artifacts_of(9).len(), 1);
    }
}
