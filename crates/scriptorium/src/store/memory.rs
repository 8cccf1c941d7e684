use super::index::StoreIndex;
use super::{ContentStore, ReferenceResolver};
use crate::error::{Result, ScriptoriumError};
use crate::template::DestinationLocator;
use crate::types::{Artifact, ContentItem, EntityRecord, Term};
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-process content store.
///
/// Useful for tests and for embedders that keep their own persistence; all
/// state is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    index: RwLock<StoreIndex>,
    content: RwLock<HashMap<u64, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&self, item: ContentItem) {
        self.index.write().items.insert(item.id, item);
    }

    pub fn add_record(&self, record: EntityRecord) {
        self.index.write().records.insert(record.id, record);
    }

    /// Attach an artifact with existing content to `parent_id`.
    pub fn attach(
        &self,
        parent_id: u64,
        artifact_type: &str,
        term: &Term,
        mime_type: &str,
        locator: &str,
        content: impl Into<Vec<u8>>,
    ) -> Artifact {
        let mut index = self.index.write();
        let parent = index
            .items
            .get(&parent_id)
            .cloned()
            .unwrap_or_else(|| ContentItem::new(parent_id, ""));
        let mut artifact = index.create(&parent, artifact_type, term);
        artifact.mime_type = Some(mime_type.to_string());
        artifact.locator = Some(locator.to_string());
        index.insert_artifact(artifact.clone());
        self.content.write().insert(artifact.id, content.into());
        artifact
    }

    pub fn artifacts_of(&self, parent_id: u64) -> Vec<Artifact> {
        self.index.read().artifacts_of(parent_id)
    }

    pub fn content_of(&self, artifact_id: u64) -> Option<Vec<u8>> {
        self.content.read().get(&artifact_id).cloned()
    }
}

impl ContentStore for MemoryContentStore {
    fn load_item(&self, id: u64) -> Result<Option<ContentItem>> {
        Ok(self.index.read().items.get(&id).cloned())
    }

    fn find_artifact_with_term(&self, parent: &ContentItem, term: &Term) -> Result<Option<Artifact>> {
        Ok(self.index.read().find_with_term(parent.id, term.id).cloned())
    }

    fn create_artifact(&self, parent: &ContentItem, artifact_type: &str, term: &Term) -> Result<Artifact> {
        Ok(self.index.write().create(parent, artifact_type, term))
    }

    fn write_content(
        &self,
        artifact: &Artifact,
        content: &[u8],
        mime_type: &str,
        locator: &DestinationLocator,
    ) -> Result<Artifact> {
        let updated = self
            .index
            .write()
            .record_write(artifact, mime_type, &locator.to_string())?;
        self.content.write().insert(artifact.id, content.to_vec());
        Ok(updated)
    }

    fn content_locator(&self, artifact: &Artifact) -> Result<Option<String>> {
        Ok(self
            .index
            .read()
            .artifacts
            .get(&artifact.id)
            .and_then(|stored| stored.locator.clone()))
    }

    fn read_content(&self, artifact: &Artifact) -> Result<Vec<u8>> {
        self.content_of(artifact.id).ok_or_else(|| {
            ScriptoriumError::precondition(format!("Could not locate source file for artifact {}", artifact.id))
        })
    }

    fn remove_artifact(&self, artifact: &Artifact) -> Result<()> {
        self.index.write().remove(artifact.id);
        self.content.write().remove(&artifact.id);
        Ok(())
    }
}

impl ReferenceResolver for MemoryContentStore {
    fn resolve_reference(&self, parent: &ContentItem, field_path: &str) -> Result<Option<EntityRecord>> {
        self.index.read().resolve(parent, field_path)
    }
}
