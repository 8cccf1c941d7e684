//! Ingestion of engine results.
//!
//! When the recognition engine finishes a [`GenerationRequest`] it posts the
//! produced content back as an [`IngestRequest`]. The ingestor resolves the
//! parent and term and hands the content to the [`Materializer`], so a
//! returning result lands on the same `(parent, term)` artifact as a
//! synchronous conversion would.
use crate::error::Result;
use crate::materialize::{MaterializeRequest, Materializer};
use crate::queue::GenerationRequest;
use crate::store::{ContentStore, require_item};
use crate::template::DestinationLocator;
use crate::types::Artifact;
use crate::vocabulary::{TermVocabulary, require_term};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Engine result ready to be materialized.
///
/// `content` travels base64-encoded in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub parent_id: u64,
    pub term_uri: String,
    pub artifact_type: String,
    pub mime_type: String,
    pub destination_uri: DestinationLocator,
    /// Source term that must still be present on the parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_term_uri: Option<String>,
    #[serde(with = "base64_content")]
    pub content: Vec<u8>,
}

impl IngestRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Answer a generation request with the engine's output.
    pub fn from_generation(request: &GenerationRequest, parent_id: u64, content: impl Into<Vec<u8>>) -> Self {
        Self {
            parent_id,
            term_uri: request.destination_term_uri.clone(),
            artifact_type: request.destination_artifact_type.clone(),
            mime_type: request.mimetype.clone(),
            destination_uri: request.destination_uri.clone(),
            source_term_uri: None,
            content: content.into(),
        }
    }
}

pub struct DerivativeIngestor {
    store: Arc<dyn ContentStore>,
    vocabulary: Arc<dyn TermVocabulary>,
    materializer: Arc<Materializer>,
}

impl DerivativeIngestor {
    pub fn new(
        store: Arc<dyn ContentStore>,
        vocabulary: Arc<dyn TermVocabulary>,
        materializer: Arc<Materializer>,
    ) -> Self {
        Self {
            store,
            vocabulary,
            materializer,
        }
    }

    #[tracing::instrument(skip_all, fields(parent = request.parent_id, term = %request.term_uri))]
    pub fn ingest(&self, request: &IngestRequest) -> Result<Artifact> {
        let parent = require_item(self.store.as_ref(), request.parent_id)?;
        let term = require_term(self.vocabulary.as_ref(), &request.term_uri, "derivative")?;
        let source = request
            .source_term_uri
            .as_deref()
            .map(|uri| require_term(self.vocabulary.as_ref(), uri, "source"))
            .transpose()?;

        self.materializer.materialize(
            &MaterializeRequest {
                parent: &parent,
                artifact_type: &request.artifact_type,
                term: &term,
                mime_type: &request.mime_type,
                destination: &request.destination_uri,
                required_source: source.as_ref(),
            },
            &request.content,
        )
    }
}

mod base64_content {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(content))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.trim()).map_err(serde::de::Error::custom)
    }
}
