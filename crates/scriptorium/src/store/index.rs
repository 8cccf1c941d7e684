use super::field_name;
use crate::error::{Result, ScriptoriumError};
use crate::types::{Artifact, ContentItem, EntityRecord, FieldValue, Term};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Item/record/artifact bookkeeping shared by the store implementations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreIndex {
    #[serde(default)]
    pub items: BTreeMap<u64, ContentItem>,
    #[serde(default)]
    pub records: BTreeMap<u64, EntityRecord>,
    #[serde(default)]
    pub artifacts: BTreeMap<u64, Artifact>,
    #[serde(default)]
    pub next_artifact_id: u64,
}

impl StoreIndex {
    pub fn find_with_term(&self, parent_id: u64, term_id: u64) -> Option<&Artifact> {
        self.artifacts
            .values()
            .find(|artifact| artifact.parent_id == parent_id && artifact.term_id == term_id)
    }

    pub fn artifacts_of(&self, parent_id: u64) -> Vec<Artifact> {
        self.artifacts
            .values()
            .filter(|artifact| artifact.parent_id == parent_id)
            .cloned()
            .collect()
    }

    pub fn create(&mut self, parent: &ContentItem, artifact_type: &str, term: &Term) -> Artifact {
        self.next_artifact_id = self.next_artifact_id.max(self.max_artifact_id()) + 1;
        let artifact = Artifact {
            id: self.next_artifact_id,
            parent_id: parent.id,
            name: format!("{} - {}", parent.title, term.name),
            artifact_type: artifact_type.to_string(),
            term_id: term.id,
            mime_type: None,
            locator: None,
        };
        self.artifacts.insert(artifact.id, artifact.clone());
        artifact
    }

    pub fn insert_artifact(&mut self, artifact: Artifact) {
        self.next_artifact_id = self.next_artifact_id.max(artifact.id);
        self.artifacts.insert(artifact.id, artifact);
    }

    pub fn remove(&mut self, artifact_id: u64) -> Option<Artifact> {
        self.artifacts.remove(&artifact_id)
    }

    pub fn record_write(&mut self, artifact: &Artifact, mime_type: &str, locator: &str) -> Result<Artifact> {
        let stored = self.artifacts.get_mut(&artifact.id).ok_or_else(|| {
            ScriptoriumError::downstream_write(format!("artifact {} does not exist in the store", artifact.id))
        })?;
        stored.mime_type = Some(mime_type.to_string());
        stored.locator = Some(locator.to_string());
        Ok(stored.clone())
    }

    pub fn resolve(&self, parent: &ContentItem, field_path: &str) -> Result<Option<EntityRecord>> {
        let field = field_name(field_path);
        match parent.fields.get(field) {
            None => Ok(None),
            Some(FieldValue::Reference(id)) => Ok(self.records.get(id).cloned()),
            Some(FieldValue::Text(_)) => Err(ScriptoriumError::validation(format!(
                "field '{}' on item {} holds text, not a reference",
                field, parent.id
            ))),
        }
    }

    fn max_artifact_id(&self) -> u64 {
        self.artifacts.keys().next_back().copied().unwrap_or(0)
    }
}
