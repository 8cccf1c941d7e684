use super::index::StoreIndex;
use super::{ContentStore, ReferenceResolver};
use crate::error::{Result, ScriptoriumError};
use crate::template::DestinationLocator;
use crate::types::{Artifact, ContentItem, EntityRecord, Term};
use parking_lot::RwLock;
use std::fs;
use std::path::{Component, Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";

/// Filesystem-backed content store.
///
/// Content for `scheme://some/path.txt` lives at `<root>/scheme/some/path.txt`.
/// Items, records and artifacts are kept in `<root>/manifest.json`, which is
/// rewritten after every change.
#[derive(Debug)]
pub struct FsContentStore {
    root: PathBuf,
    index: RwLock<StoreIndex>,
}

impl FsContentStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// - `ScriptoriumError::Io` if the root cannot be created or the manifest read
    /// - `ScriptoriumError::Serialization` if the manifest is not valid JSON
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let manifest = root.join(MANIFEST_FILE);
        let index = if manifest.exists() {
            let raw = fs::read_to_string(&manifest)?;
            serde_json::from_str(&raw).map_err(|e| {
                ScriptoriumError::serialization_with_source(format!("Invalid manifest {}", manifest.display()), e)
            })?
        } else {
            StoreIndex::default()
        };

        tracing::debug!(root = %root.display(), "opened filesystem content store");
        Ok(Self {
            root,
            index: RwLock::new(index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn add_item(&self, item: ContentItem) -> Result<()> {
        let mut index = self.index.write();
        index.items.insert(item.id, item);
        self.save(&index)
    }

    pub fn add_record(&self, record: EntityRecord) -> Result<()> {
        let mut index = self.index.write();
        index.records.insert(record.id, record);
        self.save(&index)
    }

    /// Write `content` at `locator` and register it as an artifact of `parent_id`.
    pub fn attach(
        &self,
        parent_id: u64,
        artifact_type: &str,
        term: &Term,
        mime_type: &str,
        locator: &DestinationLocator,
        content: &[u8],
    ) -> Result<Artifact> {
        let mut index = self.index.write();
        let parent = index
            .items
            .get(&parent_id)
            .cloned()
            .unwrap_or_else(|| ContentItem::new(parent_id, ""));
        self.write_file(locator, content)?;
        let created = index.create(&parent, artifact_type, term);
        let artifact = index.record_write(&created, mime_type, &locator.to_string())?;
        self.save(&index)?;
        Ok(artifact)
    }

    pub fn artifacts_of(&self, parent_id: u64) -> Vec<Artifact> {
        self.index.read().artifacts_of(parent_id)
    }

    /// Filesystem path for a locator, rejecting paths that escape the root.
    pub fn path_for(&self, locator: &DestinationLocator) -> Result<PathBuf> {
        let mut scheme = Path::new(locator.scheme()).components();
        if !matches!((scheme.next(), scheme.next()), (Some(Component::Normal(_)), None)) {
            return Err(ScriptoriumError::validation(format!(
                "locator '{}' must name a single scheme directory",
                locator
            )));
        }
        let relative = Path::new(locator.path());
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(ScriptoriumError::validation(format!(
                "locator '{}' must be a relative path without '..'",
                locator
            )));
        }
        Ok(self.root.join(locator.scheme()).join(relative))
    }

    fn write_file(&self, locator: &DestinationLocator, content: &[u8]) -> Result<()> {
        let path = self.path_for(locator)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ScriptoriumError::downstream_write_with_source(format!("Failed to create {}", parent.display()), e)
            })?;
        }
        fs::write(&path, content).map_err(|e| {
            ScriptoriumError::downstream_write_with_source(format!("Failed to write {}", locator), e)
        })
    }

    fn save(&self, index: &StoreIndex) -> Result<()> {
        let manifest = self.root.join(MANIFEST_FILE);
        let staging = self.root.join(format!("{}.tmp", MANIFEST_FILE));
        let json = serde_json::to_vec_pretty(index)?;
        fs::write(&staging, json)
            .and_then(|_| fs::rename(&staging, &manifest))
            .map_err(|e| {
                ScriptoriumError::downstream_write_with_source(format!("Failed to save {}", manifest.display()), e)
            })
    }
}

impl ContentStore for FsContentStore {
    fn load_item(&self, id: u64) -> Result<Option<ContentItem>> {
        Ok(self.index.read().items.get(&id).cloned())
    }

    fn find_artifact_with_term(&self, parent: &ContentItem, term: &Term) -> Result<Option<Artifact>> {
        Ok(self.index.read().find_with_term(parent.id, term.id).cloned())
    }

    fn create_artifact(&self, parent: &ContentItem, artifact_type: &str, term: &Term) -> Result<Artifact> {
        let mut index = self.index.write();
        let artifact = index.create(parent, artifact_type, term);
        self.save(&index)?;
        Ok(artifact)
    }

    fn write_content(
        &self,
        artifact: &Artifact,
        content: &[u8],
        mime_type: &str,
        locator: &DestinationLocator,
    ) -> Result<Artifact> {
        let mut index = self.index.write();
        if !index.artifacts.contains_key(&artifact.id) {
            return Err(ScriptoriumError::downstream_write(format!(
                "artifact {} does not exist in the store",
                artifact.id
            )));
        }
        self.write_file(locator, content)?;
        let updated = index.record_write(artifact, mime_type, &locator.to_string())?;
        self.save(&index)?;
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
        let locator = self.content_locator(artifact)?.ok_or_else(|| {
            ScriptoriumError::precondition(format!("Could not locate source file for artifact {}", artifact.id))
        })?;
        let locator: DestinationLocator = locator.parse()?;
        Ok(fs::read(self.path_for(&locator)?)?)
    }

    fn remove_artifact(&self, artifact: &Artifact) -> Result<()> {
        let mut index = self.index.write();
        let Some(removed) = index.remove(artifact.id) else {
            return Ok(());
        };
        self.save(&index)?;

        if let Some(locator) = removed.locator.as_deref() {
            let path = self.path_for(&locator.parse()?)?;
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ScriptoriumError::downstream_write_with_source(
                        format!("Failed to remove {}", path.display()),
                        e,
                    ));
                }
            }
        }
        Ok(())
    }
}

impl ReferenceResolver for FsContentStore {
    fn resolve_reference(&self, parent: &ContentItem, field_path: &str) -> Result<Option<EntityRecord>> {
        self.index.read().resolve(parent, field_path)
    }
}
