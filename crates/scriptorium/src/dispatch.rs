//! Derivative request dispatch.
//!
//! Generation flows hand the heavy lifting to an external recognition engine:
//! the dispatcher resolves the source artifact, renders where the result
//! should go, builds the engine arguments and enqueues a
//! [`GenerationRequest`]. It never waits for the engine. The result comes back
//! later through [`DerivativeIngestor`](crate::ingest::DerivativeIngestor).
use crate::config::GenerateConfig;
use crate::error::{Result, ScriptoriumError};
use crate::model::ArgumentBuilder;
use crate::queue::{DerivativeQueue, GenerationRequest};
use crate::store::{ContentStore, ReferenceResolver};
use crate::template::{PathTemplate, TemplateContext};
use crate::types::{ContentItem, Term};
use crate::vocabulary::{TermVocabulary, require_term};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Per-call dispatch parameters.
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    pub event: &'a str,
    pub source_term: &'a Term,
    pub destination_term: &'a Term,
    pub destination_artifact_type: &'a str,
    pub destination_field: Option<&'a str>,
    pub mime_type: &'a str,
    pub scheme: &'a str,
    pub path: &'a PathTemplate,
    pub queue: &'a str,
}

pub struct DerivativeDispatcher {
    store: Arc<dyn ContentStore>,
    queue: Arc<dyn DerivativeQueue>,
}

impl DerivativeDispatcher {
    pub fn new(store: Arc<dyn ContentStore>, queue: Arc<dyn DerivativeQueue>) -> Self {
        Self { store, queue }
    }

    /// Build and enqueue a generation request for `parent`.
    ///
    /// Returns a copy of the enqueued request. When the source artifact,
    /// its content locator, the destination path or the arguments cannot be
    /// resolved, nothing reaches the queue.
    #[tracing::instrument(skip_all, fields(parent = parent.id, queue = request.queue))]
    pub fn dispatch(
        &self,
        parent: &ContentItem,
        request: &DispatchRequest<'_>,
        arguments: &dyn ArgumentBuilder,
        now: DateTime<Utc>,
    ) -> Result<GenerationRequest> {
        let source = self
            .store
            .find_artifact_with_term(parent, request.source_term)?
            .ok_or_else(|| {
                ScriptoriumError::precondition(format!(
                    "Could not locate source media tagged {} on item {}",
                    request.source_term.uri, parent.id
                ))
            })?;
        let source_uri = self.store.content_locator(&source)?.ok_or_else(|| {
            ScriptoriumError::precondition(format!("Source media {} on item {} has no file", source.id, parent.id))
        })?;

        let context = TemplateContext::new(now)
            .with_node(parent)
            .with_media(&source)
            .with_term(request.destination_term);
        let destination_uri = request.path.locator(request.scheme, &context)?;
        let args = arguments.build_args(parent)?;

        let generation = GenerationRequest {
            id: Uuid::new_v4(),
            event: request.event.to_string(),
            queue: request.queue.to_string(),
            source_uri,
            destination_uri,
            destination_term_uri: request.destination_term.uri.clone(),
            destination_artifact_type: request.destination_artifact_type.to_string(),
            destination_field: request.destination_field.map(str::to_string),
            mimetype: request.mime_type.to_string(),
            args,
        };

        self.queue.enqueue(generation.clone())?;
        tracing::info!(
            request_id = %generation.id,
            source = %generation.source_uri,
            destination = %generation.destination_uri,
            "enqueued generation request"
        );
        Ok(generation)
    }
}

/// Configured generation action: terms, destination and argument strategy
/// composed around a [`DerivativeDispatcher`].
pub struct GenerationPipeline {
    config: GenerateConfig,
    vocabulary: Arc<dyn TermVocabulary>,
    dispatcher: DerivativeDispatcher,
    arguments: Box<dyn ArgumentBuilder>,
}

impl GenerationPipeline {
    /// Build the pipeline; the argument builder comes from `config.arguments`.
    pub fn new(
        config: GenerateConfig,
        store: Arc<dyn ContentStore>,
        resolver: Arc<dyn ReferenceResolver>,
        vocabulary: Arc<dyn TermVocabulary>,
        queue: Arc<dyn DerivativeQueue>,
    ) -> Self {
        let arguments = config.arguments.builder(&config.args, resolver);
        Self {
            config,
            vocabulary,
            dispatcher: DerivativeDispatcher::new(store, queue),
            arguments,
        }
    }

    /// Replace the configured argument strategy.
    pub fn with_arguments(mut self, arguments: Box<dyn ArgumentBuilder>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn execute(&self, parent: &ContentItem) -> Result<GenerationRequest> {
        self.execute_at(parent, Utc::now())
    }

    pub fn execute_at(&self, parent: &ContentItem, now: DateTime<Utc>) -> Result<GenerationRequest> {
        let config = &self.config;
        let source_term = require_term(self.vocabulary.as_ref(), &config.source_term_uri, "source")?;
        let destination_term = require_term(self.vocabulary.as_ref(), &config.derivative_term_uri, "derivative")?;

        self.dispatcher.dispatch(
            parent,
            &DispatchRequest {
                event: &config.event,
                source_term: &source_term,
                destination_term: &destination_term,
                destination_artifact_type: &config.destination_artifact_type,
                destination_field: config.destination_field.as_deref(),
                mime_type: &config.mimetype,
                scheme: &config.scheme,
                path: &config.path,
                queue: &config.queue,
            },
            self.arguments.as_ref(),
            now,
        )
    }
}
