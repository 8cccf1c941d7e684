//! Destination path templates.
//!
//! A template is a plain string with bracketed tokens such as
//! `[date:custom:Y]-[date:custom:m]/[node:nid].txt`. Tokens are resolved
//! against a [`TemplateContext`] built once per invocation.
//!
//! Supported tokens:
//!
//! | Token | Value |
//! |-------|-------|
//! | `[date:custom:<fmt>]` | current date, PHP-style format (`Y y m n d j H G i s U`, `\` escapes) |
//! | `[date:timestamp]` | current Unix timestamp |
//! | `[node:nid]`, `[node:title]` | parent item id / title |
//! | `[media:mid]`, `[media:name]` | source artifact id / name |
//! | `[term:tid]`, `[term:name]`, `[term:uri]` | destination term |
//!
//! A token that cannot be resolved, either because it is unknown or because
//! the context lacks the entity it names, fails the render with
//! `ScriptoriumError::TemplateResolution`. Nothing is ever substituted with
//! an empty string.
use crate::error::{Result, ScriptoriumError};
use crate::types::{Artifact, ContentItem, Term};
use chrono::{DateTime, Datelike, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([a-z_]+):([^\[\]]+)\]").expect("token pattern is valid"));

const PATH_SEPARATORS: [char; 2] = ['/', '\\'];

/// Values available to template tokens.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub node: Option<&'a ContentItem>,
    pub media: Option<&'a Artifact>,
    pub term: Option<&'a Term>,
    pub now: DateTime<Utc>,
}

impl<'a> TemplateContext<'a> {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            node: None,
            media: None,
            term: None,
            now,
        }
    }

    pub fn with_node(mut self, node: &'a ContentItem) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_media(mut self, media: &'a Artifact) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_term(mut self, term: &'a Term) -> Self {
        self.term = Some(term);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token { kind: String, name: String },
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        let source = template.into();
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in TOKEN.captures_iter(&source) {
            let (Some(whole), Some(kind), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(source[last..whole.start()].to_string()));
            }
            segments.push(Segment::Token {
                kind: kind.as_str().to_string(),
                name: name.as_str().to_string(),
            });
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Literal(source[last..].to_string()));
        }

        Self { source, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Literal (non-token) text of the template, in order.
    pub fn literals(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Literal(text) => Some(text.as_str()),
                Segment::Token { .. } => None,
            })
            .collect()
    }

    /// Tokens of the template as `kind:name`, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Token { kind, name } => Some(format!("{}:{}", kind, name)),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Render the template, stripping leading and trailing path separators.
    pub fn render(&self, context: &TemplateContext<'_>) -> Result<String> {
        let mut rendered = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Token { kind, name } => rendered.push_str(&resolve_token(kind, name, context)?),
            }
        }

        let trimmed = rendered.trim_matches(PATH_SEPARATORS.as_slice());
        if trimmed.is_empty() {
            return Err(ScriptoriumError::template(format!(
                "template '{}' rendered an empty path",
                self.source
            )));
        }
        Ok(trimmed.to_string())
    }

    /// Render the template and join it to `scheme` as `scheme://path`.
    pub fn locator(&self, scheme: &str, context: &TemplateContext<'_>) -> Result<DestinationLocator> {
        let path = self.render(context)?;
        DestinationLocator::new(scheme, path)
    }

    /// Match a rendered string against the template's literal segments.
    ///
    /// Returns the substituted token values in order, or `None` when the
    /// literals do not line up or two tokens are adjacent (the split would be
    /// ambiguous). Separator stripping is not undone, so `rendered` must be
    /// the unstripped form for templates with leading or trailing separators.
    pub fn capture(&self, rendered: &str) -> Option<Vec<String>> {
        let mut rest = rendered;
        let mut values = Vec::new();
        let mut pending = false;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) if pending => {
                    let at = rest.find(text.as_str())?;
                    values.push(rest[..at].to_string());
                    rest = &rest[at + text.len()..];
                    pending = false;
                }
                Segment::Literal(text) => {
                    rest = rest.strip_prefix(text.as_str())?;
                }
                Segment::Token { .. } if pending => return None,
                Segment::Token { .. } => pending = true,
            }
        }

        if pending {
            values.push(rest.to_string());
            rest = "";
        }
        rest.is_empty().then_some(values)
    }
}

impl From<String> for PathTemplate {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}

impl From<&str> for PathTemplate {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<PathTemplate> for String {
    fn from(template: PathTemplate) -> Self {
        template.source
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn resolve_token(kind: &str, name: &str, context: &TemplateContext<'_>) -> Result<String> {
    let value = match (kind, name) {
        ("date", "timestamp") => Some(context.now.timestamp().to_string()),
        ("date", custom) => custom
            .strip_prefix("custom:")
            .map(|format| format_php_date(format, &context.now)),
        ("node", "nid") => context.node.map(|node| node.id.to_string()),
        ("node", "title") => context.node.map(|node| node.title.clone()),
        ("media", "mid") => context.media.map(|media| media.id.to_string()),
        ("media", "name") => context.media.map(|media| media.name.clone()),
        ("term", "tid") => context.term.map(|term| term.id.to_string()),
        ("term", "name") => context.term.map(|term| term.name.clone()),
        ("term", "uri") => context.term.map(|term| term.uri.clone()),
        _ => None,
    };

    value.ok_or_else(|| ScriptoriumError::template(format!("unresolved token [{}:{}]", kind, name)))
}

fn format_php_date(format: &str, now: &DateTime<Utc>) -> String {
    let mut out = String::new();
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            'Y' => out.push_str(&format!("{:04}", now.year())),
            'y' => out.push_str(&format!("{:02}", now.year().rem_euclid(100))),
            'm' => out.push_str(&format!("{:02}", now.month())),
            'n' => out.push_str(&now.month().to_string()),
            'd' => out.push_str(&format!("{:02}", now.day())),
            'j' => out.push_str(&now.day().to_string()),
            'H' => out.push_str(&format!("{:02}", now.hour())),
            'G' => out.push_str(&now.hour().to_string()),
            'i' => out.push_str(&format!("{:02}", now.minute())),
            's' => out.push_str(&format!("{:02}", now.second())),
            'U' => out.push_str(&now.timestamp().to_string()),
            other => out.push(other),
        }
    }

    out
}

/// Final destination of a derivative: `scheme://path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DestinationLocator {
    scheme: String,
    path: String,
}

impl DestinationLocator {
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        let scheme = scheme.into();
        let starts_alphanumeric = scheme.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
        if !starts_alphanumeric || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-._".contains(c)) {
            return Err(ScriptoriumError::validation(format!("invalid storage scheme '{}'", scheme)));
        }
        let path = path.into().trim_matches(PATH_SEPARATORS.as_slice()).to_string();
        if path.is_empty() {
            return Err(ScriptoriumError::template(format!(
                "destination path for scheme '{}' is empty",
                scheme
            )));
        }
        Ok(Self { scheme, path })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for DestinationLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.path)
    }
}

impl FromStr for DestinationLocator {
    type Err = ScriptoriumError;

    fn from_str(locator: &str) -> Result<Self> {
        let (scheme, path) = locator
            .split_once("://")
            .ok_or_else(|| ScriptoriumError::validation(format!("locator '{}' has no scheme", locator)))?;
        Self::new(scheme, path)
    }
}

impl TryFrom<String> for DestinationLocator {
    type Error = ScriptoriumError;

    fn try_from(locator: String) -> Result<Self> {
        locator.parse()
    }
}

impl From<DestinationLocator> for String {
    fn from(locator: DestinationLocator) -> Self {
        locator.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap()
    }

    fn term() -> Term {
        Term {
            id: 12,
            name: "Extracted Text".to_string(),
            uri: "http://pcdm.org/use#ExtractedText".to_string(),
        }
    }

    #[test]
    fn test_render_default_plaintext_path() {
        let node = ContentItem::new(42, "Letter");
        let context = TemplateContext::new(fixed_now()).with_node(&node);
        let template = PathTemplate::new("[date:custom:Y]-[date:custom:m]/[node:nid].txt");
        assert_eq!(template.render(&context).unwrap(), "2024-03/42.txt");
    }

    #[test]
    fn test_render_term_name_path() {
        let node = ContentItem::new(42, "Letter");
        let term = term();
        let context = TemplateContext::new(fixed_now()).with_node(&node).with_term(&term);
        let template = PathTemplate::new("[date:custom:Y]-[date:custom:m]/[node:nid]-[term:name].shtml");
        assert_eq!(template.render(&context).unwrap(), "2024-03/42-Extracted Text.shtml");
    }

    #[test]
    fn test_php_date_characters() {
        let now = fixed_now();
        assert_eq!(format_php_date("Y-m-d H:i:s", &now), "2024-03-05 07:08:09");
        assert_eq!(format_php_date("y/n/j G", &now), "24/3/5 7");
        assert_eq!(format_php_date(r"\Y\m Y", &now), "Ym 2024");
        assert_eq!(format_php_date("U", &now), now.timestamp().to_string());
    }

    #[test]
    fn test_missing_entity_fails() {
        let context = TemplateContext::new(fixed_now());
        let err = PathTemplate::new("[node:nid].txt").render(&context).unwrap_err();
        assert!(matches!(err, ScriptoriumError::TemplateResolution { .. }));
        assert!(err.to_string().contains("[node:nid]"));
    }

    #[test]
    fn test_unknown_token_fails() {
        let node = ContentItem::new(1, "x");
        let context = TemplateContext::new(fixed_now()).with_node(&node);
        let err = PathTemplate::new("[node:nid]-[site:name]").render(&context).unwrap_err();
        assert!(err.to_string().contains("[site:name]"));
    }

    #[test]
    fn test_separators_stripped() {
        let node = ContentItem::new(9, "x");
        let context = TemplateContext::new(fixed_now()).with_node(&node);
        let template = PathTemplate::new("/\\[node:nid]/page.txt//");
        assert_eq!(template.render(&context).unwrap(), "9/page.txt");
    }

    #[test]
    fn test_separator_only_render_fails() {
        let context = TemplateContext::new(fixed_now());
        assert!(PathTemplate::new("//").render(&context).is_err());
    }

    #[test]
    fn test_bracket_text_without_token_is_literal() {
        let template = PathTemplate::new("scans/[draft]/file.txt");
        assert!(template.tokens().is_empty());
        let context = TemplateContext::new(fixed_now());
        assert_eq!(template.render(&context).unwrap(), "scans/[draft]/file.txt");
    }

    #[test]
    fn test_capture_round_trip() {
        let node = ContentItem::new(42, "Letter");
        let term = term();
        let context = TemplateContext::new(fixed_now()).with_node(&node).with_term(&term);
        let template = PathTemplate::new("[date:custom:Y]-[date:custom:m]/[node:nid]-[term:name].shtml");
        let rendered = template.render(&context).unwrap();

        let values = template.capture(&rendered).unwrap();
        assert_eq!(values, vec!["2024", "03", "42", "Extracted Text"]);

        let mut rebuilt = String::new();
        let literals = template.literals();
        assert_eq!(literals, vec!["-", "/", "-", ".shtml"]);
        for (value, literal) in values.iter().zip(literals.iter()) {
            rebuilt.push_str(value);
            rebuilt.push_str(literal);
        }
        assert_eq!(rebuilt, rendered);
    }

    #[test]
    fn test_capture_rejects_mismatch_and_adjacent_tokens() {
        let template = PathTemplate::new("ocr/[node:nid].txt");
        assert!(template.capture("hocr/1.txt").is_none());
        assert!(template.capture("ocr/1.txt.bak").is_none());
        assert_eq!(template.capture("ocr/1.txt"), Some(vec!["1".to_string()]));

        let adjacent = PathTemplate::new("[node:nid][term:tid]");
        assert!(adjacent.capture("123").is_none());
    }

    #[test]
    fn test_locator_display_and_parse() {
        let node = ContentItem::new(5, "x");
        let context = TemplateContext::new(fixed_now()).with_node(&node);
        let locator = PathTemplate::new("[node:nid]_ocr.asc").locator("fedora", &context).unwrap();
        assert_eq!(locator.to_string(), "fedora://5_ocr.asc");

        let parsed: DestinationLocator = "fedora://5_ocr.asc".parse().unwrap();
        assert_eq!(parsed, locator);
        assert!("no-scheme".parse::<DestinationLocator>().is_err());
        assert!(DestinationLocator::new("bad scheme", "x").is_err());
    }

    #[test]
    fn test_scheme_must_start_alphanumeric() {
        for scheme in ["", ".", "..", ".hidden", "-x", "_x"] {
            assert!(
                matches!(DestinationLocator::new(scheme, "a.txt"), Err(ScriptoriumError::Validation { .. })),
                "scheme {:?} accepted",
                scheme
            );
        }
        assert!("..://outside.txt".parse::<DestinationLocator>().is_err());
        assert!(serde_json::from_str::<DestinationLocator>(r#""..://outside.txt""#).is_err());
        assert_eq!(DestinationLocator::new("s3.v2", "a.txt").unwrap().scheme(), "s3.v2");
    }

    #[test]
    fn test_template_serde_as_string() {
        let template = PathTemplate::new("[node:nid].txt");
        let json = serde_json::to_string(&template).unwrap();
        assert_eq!(json, r#""[node:nid].txt""#);
        let back: PathTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, template);
    }
}
