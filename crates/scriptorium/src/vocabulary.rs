//! Classification term vocabulary.
//!
//! Configuration refers to terms by stable URI; the pipeline needs the term
//! entity itself. [`TermVocabulary`] maps between the two.
use crate::error::{Result, ScriptoriumError};
use crate::types::Term;
use indexmap::IndexMap;
use parking_lot::RwLock;

/// URI to term lookup.
pub trait TermVocabulary: Send + Sync {
    fn term_for_uri(&self, uri: &str) -> Result<Option<Term>>;

    fn uri_for_term(&self, term: &Term) -> Result<Option<String>>;
}

/// Look up a term, failing with `PreconditionMissing` when it is unknown.
///
/// `role` names what the term is used for in the error message (e.g. "HOCR").
pub fn require_term(vocabulary: &dyn TermVocabulary, uri: &str, role: &str) -> Result<Term> {
    vocabulary
        .term_for_uri(uri)?
        .ok_or_else(|| ScriptoriumError::precondition(format!("Could not locate {} term with uri: {}", role, uri)))
}

/// Vocabulary held in memory, usually seeded from configuration.
#[derive(Debug, Default)]
pub struct MemoryVocabulary {
    terms: RwLock<IndexMap<String, Term>>,
}

impl MemoryVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_terms(terms: impl IntoIterator<Item = Term>) -> Self {
        let vocabulary = Self::new();
        for term in terms {
            vocabulary.insert(term);
        }
        vocabulary
    }

    /// Insert or replace the term registered under its URI.
    pub fn insert(&self, term: Term) {
        self.terms.write().insert(term.uri.clone(), term);
    }

    pub fn len(&self) -> usize {
        self.terms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.read().is_empty()
    }
}

impl TermVocabulary for MemoryVocabulary {
    fn term_for_uri(&self, uri: &str) -> Result<Option<Term>> {
        Ok(self.terms.read().get(uri).cloned())
    }

    fn uri_for_term(&self, term: &Term) -> Result<Option<String>> {
        Ok(self
            .terms
            .read()
            .values()
            .find(|known| known.id == term.id)
            .map(|known| known.uri.clone()))
    }
}
