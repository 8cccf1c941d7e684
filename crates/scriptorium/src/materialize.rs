//! Derivative materialization (idempotent upsert).
//!
//! After a successful call exactly one artifact exists for the
//! `(parent, term)` pair: an existing one is overwritten in place, otherwise a
//! new one is created. Upserts for the same pair are serialized within the
//! process so concurrent triggers cannot create duplicates.
use crate::error::{Result, ScriptoriumError};
use crate::store::ContentStore;
use crate::template::DestinationLocator;
use crate::types::{Artifact, ContentItem, Term};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::io::Read;
use std::sync::Arc;

/// Everything but the content of a materialization.
#[derive(Debug, Clone, Copy)]
pub struct MaterializeRequest<'a> {
    pub parent: &'a ContentItem,
    pub artifact_type: &'a str,
    pub term: &'a Term,
    pub mime_type: &'a str,
    pub destination: &'a DestinationLocator,
    /// Term of the source artifact this derivative is produced from. When
    /// set, the parent must carry an artifact with it or nothing is written.
    pub required_source: Option<&'a Term>,
}

pub struct Materializer {
    store: Arc<dyn ContentStore>,
    locks: DashMap<(u64, u64), Arc<Mutex<()>>>,
}

impl Materializer {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Create or update the derivative for `(parent, term)` with `content`.
    ///
    /// # Errors
    ///
    /// - `PreconditionMissing` if `required_source` is set and absent on the parent
    /// - `DownstreamWrite` (or whatever the store reports) if persistence fails
    #[tracing::instrument(
        skip_all,
        fields(parent = request.parent.id, term = %request.term.uri, destination = %request.destination)
    )]
    pub fn materialize(&self, request: &MaterializeRequest<'_>, content: &[u8]) -> Result<Artifact> {
        if let Some(source) = request.required_source
            && self.store.find_artifact_with_term(request.parent, source)?.is_none()
        {
            return Err(ScriptoriumError::precondition(format!(
                "item {} has no source artifact tagged {}",
                request.parent.id, source.uri
            )));
        }

        let key = (request.parent.id, request.term.id);
        let lock = self.locks.entry(key).or_default().clone();
        let result = {
            let _guard = lock.lock();
            self.upsert(request, content)
        };
        drop(lock);
        self.locks.remove_if(&key, |_, held| Arc::strong_count(held) == 1);

        result
    }

    /// Like [`materialize`](Self::materialize), reading the content from `reader` first.
    pub fn materialize_reader<R: Read>(&self, request: &MaterializeRequest<'_>, mut reader: R) -> Result<Artifact> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        self.materialize(request, &content)
    }

    fn upsert(&self, request: &MaterializeRequest<'_>, content: &[u8]) -> Result<Artifact> {
        let (artifact, created) = match self.store.find_artifact_with_term(request.parent, request.term)? {
            Some(existing) => {
                tracing::debug!(artifact = existing.id, "updating existing derivative");
                (existing, false)
            }
            None => (
                self.store
                    .create_artifact(request.parent, request.artifact_type, request.term)?,
                true,
            ),
        };

        let written = match self
            .store
            .write_content(&artifact, content, request.mime_type, request.destination)
        {
            Ok(written) => written,
            Err(e) => {
                // A new artifact without content must not stay behind.
                if created && let Err(cleanup) = self.store.remove_artifact(&artifact) {
                    tracing::warn!(artifact = artifact.id, error = %cleanup, "failed to remove unwritten artifact");
                }
                return Err(e);
            }
        };
        tracing::info!(artifact = written.id, bytes = content.len(), "materialized derivative");
        Ok(written)
    }
}
