//! Configuration loading and management.
//!
//! Deployment values (term URIs, artifact types, storage schemes, path
//! templates, queue names, argument strategy) are loaded from TOML, YAML or
//! JSON and can be discovered by walking up from the current directory.
//!
//! ```toml
//! default_scheme = "public"
//!
//! [ocr]
//! path = "[date:custom:Y]-[date:custom:m]/[node:nid]_ocr.asc"
//!
//! [generate]
//! queue = "islandora-connector-transkribus"
//! arguments = { kind = "full_model", field = "field_htr_model" }
//!
//! [[terms]]
//! id = 1
//! name = "hOCR"
//! uri = "https://discoverygarden.ca/use#hocr"
//! ```
use crate::error::{Result, ScriptoriumError};
use crate::hocr::OutputMode;
use crate::model::ArgumentStrategy;
use crate::template::PathTemplate;
use crate::types::{HTML_MIME_TYPE, PLAIN_TEXT_MIME_TYPE, Term};
use crate::vocabulary::MemoryVocabulary;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "scriptorium.toml";

pub const HOCR_TERM_URI: &str = "https://discoverygarden.ca/use#hocr";
pub const EXTRACTED_TEXT_TERM_URI: &str = "http://pcdm.org/use#ExtractedText";
pub const ORIGINAL_FILE_TERM_URI: &str = "http://pcdm.org/use#OriginalFile";

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptoriumConfig {
    /// Storage scheme used by conversions that do not set their own.
    #[serde(default = "default_scheme")]
    pub default_scheme: String,

    /// hOCR to plain text transcript conversion.
    #[serde(default = "ConversionConfig::plaintext", deserialize_with = "plaintext_section")]
    pub plaintext: ConversionConfig,

    /// hOCR to OCR derivative conversion.
    #[serde(default = "ConversionConfig::ocr", deserialize_with = "ocr_section")]
    pub ocr: ConversionConfig,

    /// HTR generation request dispatch.
    #[serde(default)]
    pub generate: GenerateConfig,

    /// Vocabulary seed.
    #[serde(default)]
    pub terms: Vec<Term>,
}

/// Settings for one hOCR conversion action.
///
/// Keys missing from a `[plaintext]` or `[ocr]` section keep that preset's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub hocr_term_uri: String,
    pub destination_term_uri: String,
    pub destination_artifact_type: String,
    /// Storage scheme (None = `default_scheme`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    pub path: PathTemplate,
    pub mime_type: String,
    pub output: OutputMode,
}

/// A partially specified conversion section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConversionOverrides {
    hocr_term_uri: Option<String>,
    destination_term_uri: Option<String>,
    destination_artifact_type: Option<String>,
    scheme: Option<String>,
    path: Option<PathTemplate>,
    mime_type: Option<String>,
    output: Option<OutputMode>,
}

impl ConversionOverrides {
    fn apply(self, preset: ConversionConfig) -> ConversionConfig {
        ConversionConfig {
            hocr_term_uri: self.hocr_term_uri.unwrap_or(preset.hocr_term_uri),
            destination_term_uri: self.destination_term_uri.unwrap_or(preset.destination_term_uri),
            destination_artifact_type: self.destination_artifact_type.unwrap_or(preset.destination_artifact_type),
            scheme: self.scheme.or(preset.scheme),
            path: self.path.unwrap_or(preset.path),
            mime_type: self.mime_type.unwrap_or(preset.mime_type),
            output: self.output.unwrap_or(preset.output),
        }
    }
}

fn plaintext_section<'de, D>(deserializer: D) -> std::result::Result<ConversionConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(ConversionOverrides::deserialize(deserializer)?.apply(ConversionConfig::plaintext()))
}

fn ocr_section<'de, D>(deserializer: D) -> std::result::Result<ConversionConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(ConversionOverrides::deserialize(deserializer)?.apply(ConversionConfig::ocr()))
}

impl ConversionConfig {
    /// "Convert HOCR Media to Plain Text Transcript"
    pub fn plaintext() -> Self {
        Self {
            hocr_term_uri: HOCR_TERM_URI.to_string(),
            destination_term_uri: EXTRACTED_TEXT_TERM_URI.to_string(),
            destination_artifact_type: default_text_artifact_type(),
            scheme: None,
            path: PathTemplate::new("[date:custom:Y]-[date:custom:m]/[node:nid].txt"),
            mime_type: PLAIN_TEXT_MIME_TYPE.to_string(),
            output: OutputMode::Streamed,
        }
    }

    /// "Convert HOCR to OCR Derivative"
    pub fn ocr() -> Self {
        Self {
            path: PathTemplate::new("[date:custom:Y]-[date:custom:m]/[node:nid]_ocr.asc"),
            output: OutputMode::Buffered,
            ..Self::plaintext()
        }
    }

    pub fn scheme_or<'a>(&'a self, default_scheme: &'a str) -> &'a str {
        self.scheme.as_deref().unwrap_or(default_scheme)
    }

    fn validate(&self, section: &str) -> Result<()> {
        require(section, "hocr_term_uri", &self.hocr_term_uri)?;
        require(section, "destination_term_uri", &self.destination_term_uri)?;
        require(section, "destination_artifact_type", &self.destination_artifact_type)?;
        require(section, "path", self.path.as_str())?;
        require(section, "mime_type", &self.mime_type)?;
        if let Some(scheme) = &self.scheme {
            require(section, "scheme", scheme)?;
        }
        Ok(())
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self::plaintext()
    }
}

/// Settings for the HTR generation action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub event: String,
    pub source_term_uri: String,
    pub derivative_term_uri: String,
    pub destination_artifact_type: String,
    /// File field on the source artifact receiving the result, instead of a
    /// new artifact on the parent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_field: Option<String>,
    pub mimetype: String,
    pub queue: String,
    pub scheme: String,
    pub path: PathTemplate,
    /// Additional arguments for the recognition microservice.
    pub args: String,
    pub arguments: ArgumentStrategy,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            event: "Generate Transkribus HOCR Derivative".to_string(),
            source_term_uri: ORIGINAL_FILE_TERM_URI.to_string(),
            derivative_term_uri: EXTRACTED_TEXT_TERM_URI.to_string(),
            destination_artifact_type: default_text_artifact_type(),
            destination_field: None,
            mimetype: HTML_MIME_TYPE.to_string(),
            queue: "islandora-connector-transkribus".to_string(),
            scheme: "fedora".to_string(),
            path: PathTemplate::new("[date:custom:Y]-[date:custom:m]/[node:nid]-[term:name].shtml"),
            args: String::new(),
            arguments: ArgumentStrategy::Static,
        }
    }
}

impl GenerateConfig {
    fn validate(&self) -> Result<()> {
        require("generate", "source_term_uri", &self.source_term_uri)?;
        require("generate", "derivative_term_uri", &self.derivative_term_uri)?;
        require("generate", "destination_artifact_type", &self.destination_artifact_type)?;
        require("generate", "mimetype", &self.mimetype)?;
        require("generate", "queue", &self.queue)?;
        require("generate", "scheme", &self.scheme)?;
        require("generate", "path", self.path.as_str())?;
        if let Some(field) = self.arguments.model_field() {
            require("generate", "arguments.field", field)?;
        }
        if let Some(field) = &self.destination_field {
            require("generate", "destination_field", field)?;
        }
        Ok(())
    }
}

fn default_scheme() -> String {
    "public".to_string()
}

fn default_text_artifact_type() -> String {
    "extracted_text".to_string()
}

fn require(section: &str, key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ScriptoriumError::validation(format!("{}.{} must not be empty", section, key)));
    }
    Ok(())
}

fn trim_template(template: &PathTemplate) -> PathTemplate {
    PathTemplate::new(template.as_str().trim_matches(['/', '\\']))
}

impl Default for ScriptoriumConfig {
    fn default() -> Self {
        Self {
            default_scheme: default_scheme(),
            plaintext: ConversionConfig::plaintext(),
            ocr: ConversionConfig::ocr(),
            generate: GenerateConfig::default(),
            terms: Vec::new(),
        }
    }
}

impl ScriptoriumConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ScriptoriumError::Validation` if the file can't be read, is
    /// invalid TOML, or fails [`validate`](Self::validate).
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ScriptoriumError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))?;
        config.normalized()
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| ScriptoriumError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))?;
        config.normalized()
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ScriptoriumError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))?;
        config.normalized()
    }

    /// Load configuration, choosing the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("toml") => Self::from_toml_file(path),
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ScriptoriumError::validation(format!(
                "Unsupported config file format: {}. Supported formats: .toml, .yaml, .yml, .json",
                path.display()
            ))),
        }
    }

    /// Discover configuration file in parent directories.
    ///
    /// Searches for `scriptorium.toml` in the current directory and its parents.
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir()?;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "discovered configuration");
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Check that every required value is present.
    pub fn validate(&self) -> Result<()> {
        require("config", "default_scheme", &self.default_scheme)?;
        self.plaintext.validate("plaintext")?;
        self.ocr.validate("ocr")?;
        self.generate.validate()?;
        for term in &self.terms {
            require("terms", "uri", &term.uri)?;
        }
        Ok(())
    }

    /// Vocabulary seeded with the configured terms.
    pub fn vocabulary(&self) -> MemoryVocabulary {
        MemoryVocabulary::from_terms(self.terms.iter().cloned())
    }

    /// Trim leading and trailing separators from configured path templates,
    /// then validate.
    fn normalized(mut self) -> Result<Self> {
        self.plaintext.path = trim_template(&self.plaintext.path);
        self.ocr.path = trim_template(&self.ocr.path);
        self.generate.path = trim_template(&self.generate.path);
        self.validate()?;
        Ok(self)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| ScriptoriumError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ScriptoriumConfig::default();
        assert_eq!(config.default_scheme, "public");
        assert_eq!(config.plaintext.path.as_str(), "[date:custom:Y]-[date:custom:m]/[node:nid].txt");
        assert_eq!(config.ocr.path.as_str(), "[date:custom:Y]-[date:custom:m]/[node:nid]_ocr.asc");
        assert_eq!(config.plaintext.output, OutputMode::Streamed);
        assert_eq!(config.ocr.output, OutputMode::Buffered);
        assert_eq!(config.generate.queue, "islandora-connector-transkribus");
        assert_eq!(config.generate.scheme, "fedora");
        assert_eq!(config.generate.mimetype, "text/html");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scriptorium.toml");
        fs::write(
            &path,
            r#"
default_scheme = "private"

[ocr]
path = "/ocr/[node:nid].asc/"

[generate]
queue = "htr"
args = "--lang=deu"
arguments = { kind = "full_model", field = "field_htr_model" }

[[terms]]
id = 1
name = "hOCR"
uri = "https://discoverygarden.ca/use#hocr"
"#,
        )
        .unwrap();

        let config = ScriptoriumConfig::from_file(&path).unwrap();
        assert_eq!(config.default_scheme, "private");
        assert_eq!(config.ocr.path.as_str(), "ocr/[node:nid].asc");
        assert_eq!(config.ocr.hocr_term_uri, HOCR_TERM_URI);
        assert_eq!(config.ocr.output, OutputMode::Buffered);
        assert_eq!(config.plaintext, ConversionConfig::plaintext());
        assert_eq!(config.generate.queue, "htr");
        assert_eq!(
            config.generate.arguments,
            ArgumentStrategy::FullModel {
                field: "field_htr_model".to_string()
            }
        );
        assert_eq!(config.vocabulary().len(), 1);
    }

    #[test]
    fn test_from_yaml_and_json_files() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("config.yml");
        fs::write(&yaml, "generate:\n  queue: yaml-queue\n").unwrap();
        assert_eq!(ScriptoriumConfig::from_file(&yaml).unwrap().generate.queue, "yaml-queue");

        let json = dir.path().join("config.json");
        fs::write(&json, r#"{"default_scheme": "s3"}"#).unwrap();
        assert_eq!(ScriptoriumConfig::from_file(&json).unwrap().default_scheme, "s3");
    }

    #[test]
    fn test_partial_ocr_section_keeps_ocr_preset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scriptorium.toml");
        fs::write(&path, "[ocr]\nscheme = \"private\"\n").unwrap();

        let config = ScriptoriumConfig::from_file(&path).unwrap();
        assert_eq!(config.ocr.scheme_or("public"), "private");
        assert_eq!(config.ocr.path, ConversionConfig::ocr().path);
        assert_eq!(config.plaintext.scheme_or("public"), "public");
    }

    #[test]
    fn test_unknown_conversion_key_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scriptorium.toml");
        fs::write(&path, "[plaintext]\npaht = \"x.txt\"\n").unwrap();
        assert!(ScriptoriumConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, "").unwrap();
        assert!(matches!(
            ScriptoriumConfig::from_file(&path),
            Err(ScriptoriumError::Validation { .. })
        ));
    }

    #[test]
    fn test_empty_required_value_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[generate]\nqueue = \"\"\n").unwrap();
        let err = ScriptoriumConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("generate.queue"));
    }

    #[test]
    fn test_empty_model_field_rejected() {
        let mut config = ScriptoriumConfig::default();
        config.generate.arguments = ArgumentStrategy::ModelId { field: " ".to_string() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = ScriptoriumConfig::from_toml_file("/nonexistent/scriptorium.toml");
        assert!(matches!(result, Err(ScriptoriumError::Validation { .. })));
    }
}
