//! Content store collaborators.
//!
//! The pipeline never talks to a repository directly. It depends on the
//! [`ContentStore`] operations below (find by term, create, locate and
//! read/write content) and on [`ReferenceResolver`] for following a field on
//! a parent item to a referenced configuration record.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryContentStore`] keeps everything in process memory.
//! - [`FsContentStore`] writes content under `<root>/<scheme>/<path>` and
//!   keeps a JSON manifest of items, records and artifacts.
mod fs;
mod index;
mod memory;

pub use fs::FsContentStore;
pub use memory::MemoryContentStore;

use crate::error::{Result, ScriptoriumError};
use crate::template::DestinationLocator;
use crate::types::{Artifact, ContentItem, EntityRecord, Term};

/// Repository operations the derivative pipeline depends on.
///
/// # Thread Safety
///
/// Stores must be `Send + Sync`; the materializer may call them from several
/// threads at once.
pub trait ContentStore: Send + Sync {
    /// Load a parent item by id.
    fn load_item(&self, id: u64) -> Result<Option<ContentItem>>;

    /// Find the artifact on `parent` tagged with `term`.
    fn find_artifact_with_term(&self, parent: &ContentItem, term: &Term) -> Result<Option<Artifact>>;

    /// Create an empty artifact of `artifact_type` tagged with `term`.
    fn create_artifact(&self, parent: &ContentItem, artifact_type: &str, term: &Term) -> Result<Artifact>;

    /// Persist `content` for `artifact` at `locator`, returning the updated artifact.
    ///
    /// Failures surface as `ScriptoriumError::DownstreamWrite`.
    fn write_content(
        &self,
        artifact: &Artifact,
        content: &[u8],
        mime_type: &str,
        locator: &DestinationLocator,
    ) -> Result<Artifact>;

    /// Locator of the artifact's binary content, if it has any.
    fn content_locator(&self, artifact: &Artifact) -> Result<Option<String>>;

    /// Read the artifact's binary content.
    fn read_content(&self, artifact: &Artifact) -> Result<Vec<u8>>;

    /// Delete `artifact` and any content held for it. Unknown artifacts are ignored.
    fn remove_artifact(&self, artifact: &Artifact) -> Result<()>;
}

/// Follows a reference field on a parent item to the record it points at.
pub trait ReferenceResolver: Send + Sync {
    /// Resolve `field_path` on `parent`.
    ///
    /// The path may be dotted (`node.field_htr_model`); only its final
    /// segment names the field that is read. Returns `None` when the field
    /// is absent or points at a record that does not exist.
    fn resolve_reference(&self, parent: &ContentItem, field_path: &str) -> Result<Option<EntityRecord>>;
}

/// Load a parent item, failing with `PreconditionMissing` when it does not exist.
pub fn require_item(store: &dyn ContentStore, id: u64) -> Result<ContentItem> {
    store
        .load_item(id)?
        .ok_or_else(|| ScriptoriumError::precondition(format!("Could not locate item {}", id)))
}

/// Final segment of a dotted field path.
pub(crate) fn field_name(field_path: &str) -> &str {
    field_path.rsplit('.').next().unwrap_or(field_path).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_item() {
        let store = MemoryContentStore::new();
        store.add_item(ContentItem::new(3, "Diary"));
        assert_eq!(require_item(&store, 3).unwrap().title, "Diary");
        let err = require_item(&store, 4).unwrap_err();
        assert_eq!(err.to_string(), "Precondition missing: Could not locate item 4");
    }

    #[test]
    fn test_field_name_uses_last_segment() {
        assert_eq!(field_name("field_model"), "field_model");
        assert_eq!(field_name("node.field_model"), "field_model");
        assert_eq!(field_name("a.b.field_model"), "field_model");
    }
}
