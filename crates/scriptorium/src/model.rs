//! Recognition model parameters and engine argument building.
//!
//! HTR generation requests carry an argument string for the recognition
//! microservice. For model-driven flows the parent item has a field that
//! references a recognition model record; that record's fields become
//! `--key=value` tokens after the `page` command:
//!
//! ```text
//! page --htrid=36202 --baselineaccuracythreshold=0.6 --numtextregions=2
//! ```
//!
//! Optional parameters are emitted only when the record field is non-empty,
//! always in the order of [`OPTIONAL_PARAMETERS`].
use crate::error::{Result, ScriptoriumError};
use crate::store::ReferenceResolver;
use crate::types::{ContentItem, EntityRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Engine command every model argument string starts with.
pub const ENGINE_COMMAND: &str = "page";

/// Record field (and argument key) holding the HTR model id.
pub const HTRID: &str = "htrid";
pub const BASELINE_ACCURACY_THRESHOLD: &str = "baselineaccuracythreshold";
pub const LINE_DETECTION_MODEL_ID: &str = "linedetectionmodelid";
pub const MAX_DIST_FOR_MERGING: &str = "maxdistformerging";
pub const MINIMAL_BASELINE_LENGTH: &str = "minimalbaselinelength";
pub const NUM_TEXT_REGIONS: &str = "numtextregions";

/// Optional model parameters, in emission order.
pub const OPTIONAL_PARAMETERS: [&str; 5] = [
    BASELINE_ACCURACY_THRESHOLD,
    LINE_DETECTION_MODEL_ID,
    MAX_DIST_FOR_MERGING,
    MINIMAL_BASELINE_LENGTH,
    NUM_TEXT_REGIONS,
];

/// Read-only projection of a recognition model record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub htrid: String,
    /// Optional `(key, value)` pairs that were present, in emission order.
    pub optional: Vec<(String, String)>,
}

impl ModelParameters {
    /// Project a model record. The `htrid` field is required.
    pub fn from_record(record: &EntityRecord) -> Result<Self> {
        let htrid = record.non_empty(HTRID).ok_or_else(|| {
            ScriptoriumError::precondition(format!(
                "recognition model {} ('{}') has no {} value",
                record.id, record.label, HTRID
            ))
        })?;

        let optional = OPTIONAL_PARAMETERS
            .iter()
            .filter_map(|key| record.non_empty(key).map(|value| (key.to_string(), value.to_string())))
            .collect();

        Ok(Self {
            htrid: htrid.to_string(),
            optional,
        })
    }

    /// `page --htrid=<id>`
    pub fn model_id_args(&self) -> String {
        format!("{} --{}={}", ENGINE_COMMAND, HTRID, self.htrid)
    }

    /// `page --htrid=<id>` followed by every present optional parameter.
    pub fn full_args(&self) -> String {
        let mut args = self.model_id_args();
        for (key, value) in &self.optional {
            args.push_str(&format!(" --{}={}", key, value));
        }
        args
    }
}

/// Builds the engine argument string for one parent item.
///
/// Implemented for closures too, so callers can plug in their own strategy:
///
/// ```rust
/// use scriptorium::model::ArgumentBuilder;
/// use scriptorium::types::ContentItem;
///
/// let builder = |item: &ContentItem| -> scriptorium::Result<String> { Ok(format!("page --item={}", item.id)) };
/// assert_eq!(builder.build_args(&ContentItem::new(4, "x")).unwrap(), "page --item=4");
/// ```
pub trait ArgumentBuilder: Send + Sync {
    fn build_args(&self, parent: &ContentItem) -> Result<String>;
}

impl<F> ArgumentBuilder for F
where
    F: Fn(&ContentItem) -> Result<String> + Send + Sync,
{
    fn build_args(&self, parent: &ContentItem) -> Result<String> {
        self(parent)
    }
}

/// Fixed argument string from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticArguments {
    args: String,
}

impl StaticArguments {
    pub fn new(args: impl Into<String>) -> Self {
        Self { args: args.into() }
    }
}

impl ArgumentBuilder for StaticArguments {
    fn build_args(&self, _parent: &ContentItem) -> Result<String> {
        Ok(self.args.trim().to_string())
    }
}

/// Which model parameters to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelDetail {
    /// Only `--htrid`.
    ModelId,
    /// `--htrid` plus all present optional parameters.
    Full,
}

/// Arguments built from the recognition model referenced by a parent field.
pub struct ModelArguments {
    resolver: Arc<dyn ReferenceResolver>,
    field: String,
    detail: ModelDetail,
    extra: String,
}

impl ModelArguments {
    pub fn new(resolver: Arc<dyn ReferenceResolver>, field: impl Into<String>, detail: ModelDetail) -> Self {
        Self {
            resolver,
            field: field.into(),
            detail,
            extra: String::new(),
        }
    }

    /// Extra arguments appended after the model tokens when non-empty.
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }
}

impl ArgumentBuilder for ModelArguments {
    fn build_args(&self, parent: &ContentItem) -> Result<String> {
        if self.field.trim().is_empty() {
            return Err(ScriptoriumError::validation("recognition model field name is empty"));
        }

        let record = self.resolver.resolve_reference(parent, &self.field)?.ok_or_else(|| {
            ScriptoriumError::precondition(format!(
                "field '{}' on item {} does not reference a recognition model",
                self.field, parent.id
            ))
        })?;
        let parameters = ModelParameters::from_record(&record)?;

        let mut args = match self.detail {
            ModelDetail::ModelId => parameters.model_id_args(),
            ModelDetail::Full => parameters.full_args(),
        };
        let extra = self.extra.trim();
        if !extra.is_empty() {
            args.push(' ');
            args.push_str(extra);
        }

        tracing::debug!(item = parent.id, model = record.id, %args, "built model arguments");
        Ok(args)
    }
}

/// Configured argument strategy for a generation action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgumentStrategy {
    /// Use the configured `args` string as-is.
    #[default]
    Static,
    /// Minimal resolver: model id only.
    ModelId { field: String },
    /// Full resolver: model id plus every present optional parameter.
    FullModel { field: String },
}

impl ArgumentStrategy {
    /// Build the argument builder for this strategy.
    ///
    /// `args` is the configured static argument string; for model strategies
    /// it is appended after the model tokens.
    pub fn builder(&self, args: &str, resolver: Arc<dyn ReferenceResolver>) -> Box<dyn ArgumentBuilder> {
        match self {
            Self::Static => Box::new(StaticArguments::new(args)),
            Self::ModelId { field } => {
                Box::new(ModelArguments::new(resolver, field.clone(), ModelDetail::ModelId).with_extra(args))
            }
            Self::FullModel { field } => {
                Box::new(ModelArguments::new(resolver, field.clone(), ModelDetail::Full).with_extra(args))
            }
        }
    }

    pub fn model_field(&self) -> Option<&str> {
        match self {
            Self::Static => None,
            Self::ModelId { field } | Self::FullModel { field } => Some(field),
        }
    }
}
