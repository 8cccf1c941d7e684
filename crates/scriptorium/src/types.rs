use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";
pub const HTML_MIME_TYPE: &str = "text/html";

/// A parent content item (a repository node) that derivatives hang off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    #[serde(default)]
    pub title: String,

    /// Named fields on the item. References to other records (e.g. a
    /// recognition model) are stored as [`FieldValue::Reference`].
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl ContentItem {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Value of a named field on a [`ContentItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    /// Reference to an [`EntityRecord`] by id.
    Reference(u64),
}

/// A configuration record referenced from a content item field.
///
/// Field values are kept as strings; empty strings count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: u64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl EntityRecord {
    /// Returns the field value when it is present and non-empty after trimming.
    pub fn non_empty(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// A classification term identifying the role of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    pub name: String,
    pub uri: String,
}

/// A stored artifact (media) attached to a parent item under one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: u64,
    pub parent_id: u64,
    #[serde(default)]
    pub name: String,
    pub artifact_type: String,
    pub term_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Locator of the binary content (`scheme://path`), if any has been written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_skips_blank_fields() {
        let mut record = EntityRecord::default();
        record.fields.insert("htrid".to_string(), "  ".to_string());
        record.fields.insert("numtextregions".to_string(), "3".to_string());

        assert_eq!(record.non_empty("htrid"), None);
        assert_eq!(record.non_empty("missing"), None);
        assert_eq!(record.non_empty("numtextregions"), Some("3"));
    }

    #[test]
    fn test_field_value_serialization() {
        let item = ContentItem::new(7, "Letter").with_field("field_model", FieldValue::Reference(3));
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""type":"reference""#));

        let back: ContentItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
