//! Error types for scriptorium.
//!
//! Every fallible operation in the crate returns [`ScriptoriumError`]. The
//! variants mirror the failure kinds of the derivative pipeline:
//!
//! - `PreconditionMissing` - a required term, source artifact or model field is absent
//! - `Parsing` - hOCR markup could not be parsed
//! - `TemplateResolution` - a destination path could not be rendered
//! - `DownstreamWrite` - the content store failed to persist an artifact
//! - `Queue` - the queue collaborator refused a generation request
//!
//! **System errors bubble up unchanged:** `ScriptoriumError::Io` wraps
//! `std::io::Error` from `?` and is never rewrapped into another variant.
//!
//! # Example
//!
//! ```rust
//! use scriptorium::{ScriptoriumError, Result};
//!
//! fn require_uri(uri: &str) -> Result<&str> {
//!     if uri.is_empty() {
//!         return Err(ScriptoriumError::validation("term URI is empty"));
//!     }
//!     Ok(uri)
//! }
//!
//! assert!(require_uri("").is_err());
//! ```
use thiserror::Error;

/// Result type alias using `ScriptoriumError`.
pub type Result<T> = std::result::Result<T, ScriptoriumError>;

/// Main error type for all scriptorium operations.
///
/// Messages always name the term URI, field, artifact or locator involved so a
/// failure can be diagnosed without re-running the pipeline.
#[derive(Debug, Error)]
pub enum ScriptoriumError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Precondition missing: {message}")]
    PreconditionMissing { message: String },

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Template resolution error: {message}")]
    TemplateResolution { message: String },

    #[error("Downstream write error: {message}")]
    DownstreamWrite {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Queue '{queue}' rejected request: {message}")]
    Queue { queue: String, message: String },
}

impl From<serde_json::Error> for ScriptoriumError {
    fn from(err: serde_json::Error) -> Self {
        ScriptoriumError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<roxmltree::Error> for ScriptoriumError {
    fn from(err: roxmltree::Error) -> Self {
        ScriptoriumError::Parsing {
            message: format!("malformed hOCR markup: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl ScriptoriumError {
    error_constructor!(parsing, Parsing);
    error_constructor!(downstream_write, DownstreamWrite);
    error_constructor!(validation, Validation);
    error_constructor!(serialization, Serialization);

    /// Create a PreconditionMissing error
    pub fn precondition<S: Into<String>>(message: S) -> Self {
        Self::PreconditionMissing {
            message: message.into(),
        }
    }

    /// Create a TemplateResolution error
    pub fn template<S: Into<String>>(message: S) -> Self {
        Self::TemplateResolution {
            message: message.into(),
        }
    }

    /// Create a Queue error for the named queue
    pub fn queue<Q: Into<String>, S: Into<String>>(queue: Q, message: S) -> Self {
        Self::Queue {
            queue: queue.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScriptoriumError = io_err.into();
        assert!(matches!(err, ScriptoriumError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_precondition_error() {
        let err = ScriptoriumError::precondition("Could not locate HOCR media");
        assert_eq!(err.to_string(), "Precondition missing: Could not locate HOCR media");
    }

    #[test]
    fn test_parsing_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad data");
        let err = ScriptoriumError::parsing_with_source("invalid markup", source);
        assert_eq!(err.to_string(), "Parsing error: invalid markup");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_template_error() {
        let err = ScriptoriumError::template("unresolved token [node:nid]");
        assert_eq!(err.to_string(), "Template resolution error: unresolved token [node:nid]");
    }

    #[test]
    fn test_downstream_write_error() {
        let err = ScriptoriumError::downstream_write("disk full");
        assert!(matches!(err, ScriptoriumError::DownstreamWrite { .. }));
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_validation_error() {
        let err = ScriptoriumError::validation("invalid storage scheme '..'");
        assert_eq!(err.to_string(), "Validation error: invalid storage scheme '..'");
    }

    #[test]
    fn test_queue_error_names_queue() {
        let err = ScriptoriumError::queue("islandora-connector-transkribus", "receiver dropped");
        assert_eq!(
            err.to_string(),
            "Queue 'islandora-connector-transkribus' rejected request: receiver dropped"
        );
    }

    #[test]
    fn test_serde_json_error_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let err: ScriptoriumError = json_err.into();
        assert!(matches!(err, ScriptoriumError::Serialization { .. }));
    }

    #[test]
    fn test_roxmltree_error_from() {
        let xml_err = roxmltree::Document::parse("<p><span></p>").unwrap_err();
        let err: ScriptoriumError = xml_err.into();
        assert!(matches!(err, ScriptoriumError::Parsing { .. }));
        assert!(err.to_string().contains("malformed hOCR markup"));
    }
}
