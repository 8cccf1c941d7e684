//! Scriptorium - hOCR Text Extraction and Derivative Pipeline
//!
//! Scriptorium turns hOCR (HTML-based OCR output) into plain text and stores
//! the result as a derivative artifact on a parent content item. Generation
//! flows that need an external recognition engine are dispatched through a
//! queue and ingested when the engine answers.
//!
//! # Quick Start
//!
//! ```rust
//! use scriptorium::hocr::extract_text;
//!
//! # fn main() -> scriptorium::Result<()> {
//! let text = extract_text(r#"<p><span class="ocr_line"><span>Hello</span> <span>world</span></span></p>"#)?;
//! assert_eq!(text, "Hello world\n\n");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **hOCR** (`hocr`): paragraph/line/word parser and the text linearizer
//! - **Templates** (`template`): token-based destination paths and `scheme://path` locators
//! - **Materializer** (`materialize`): idempotent upsert of one artifact per `(parent, term)`
//! - **Conversions** (`convert`): configured hOCR to text actions
//! - **Dispatch** (`dispatch`, `model`, `queue`): generation requests for the recognition engine
//! - **Ingestion** (`ingest`): engine results back into the materializer
//! - **Collaborators** (`store`, `vocabulary`): content store and term vocabulary seams

#![deny(unsafe_code)]

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod hocr;
pub mod ingest;
pub mod materialize;
pub mod model;
pub mod queue;
pub mod store;
pub mod template;
pub mod types;
pub mod vocabulary;

pub use error::{Result, ScriptoriumError};

pub use config::{ConversionConfig, GenerateConfig, ScriptoriumConfig};
pub use convert::HocrConversion;
pub use dispatch::{DerivativeDispatcher, DispatchRequest, GenerationPipeline};
pub use hocr::{HocrDocument, OutputMode, extract_text};
pub use ingest::{DerivativeIngestor, IngestRequest};
pub use materialize::{MaterializeRequest, Materializer};
pub use model::{ArgumentBuilder, ArgumentStrategy, ModelParameters};
pub use queue::{DerivativeQueue, GenerationRequest, MemoryQueue};
pub use store::{ContentStore, FsContentStore, MemoryContentStore, ReferenceResolver};
pub use template::{DestinationLocator, PathTemplate, TemplateContext};
pub use types::{Artifact, ContentItem, EntityRecord, FieldValue, Term};
pub use vocabulary::{MemoryVocabulary, TermVocabulary};

#[cfg(feature = "tokio-runtime")]
pub use queue::ChannelQueue;
