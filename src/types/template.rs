use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prompt type sent when no template is selected.
pub const DEFAULT_PROMPT_TYPE: &str = "query";

/// Composite key selecting a prompt template on the server.
///
/// The string form is `type` or `type.subtype`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateKey {
    /// Template category.
    pub kind: String,

    /// Optional sub-template within the category.
    pub subtype: Option<String>,
}

impl TemplateKey {
    /// Create a key for a whole category.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            subtype: None,
        }
    }

    /// Narrow the key to a sub-template.
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subtype {
            Some(subtype) => write!(f, "{}.{}", self.kind, subtype),
            None => f.write_str(&self.kind),
        }
    }
}

impl FromStr for TemplateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut parts = s.splitn(2, '.');
        let kind = parts.next().unwrap_or_default().trim();
        if kind.is_empty() {
            return Err(Error::invalid_request(
                format!("template key '{s}' has no type"),
                Some("prompt_type".to_string()),
            ));
        }
        let subtype = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(TemplateKey {
            kind: kind.to_string(),
            subtype,
        })
    }
}

/// A sub-template offered within a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSubtype {
    /// Name, used as the subtype part of a [`TemplateKey`].
    pub name: String,

    /// Optional machine type tag.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// The template text, if the server exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A prompt template category from the listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Category type tag.
    #[serde(rename = "type")]
    pub kind: String,

    /// Display name.
    pub name: String,

    /// Sub-templates, possibly empty.
    #[serde(default)]
    pub subtypes: Vec<TemplateSubtype>,

    /// The template text, if the server exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl PromptTemplate {
    /// Create a category without subtypes.
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            subtypes: Vec::new(),
            content: None,
        }
    }

    /// The key selecting the whole category.
    pub fn key(&self) -> TemplateKey {
        TemplateKey::new(self.kind.clone())
    }

    /// Look up a subtype by name.
    pub fn subtype(&self, name: &str) -> Option<&TemplateSubtype> {
        self.subtypes.iter().find(|s| s.name == name)
    }

    /// The text of the template addressed by `key`, if this category holds it.
    pub fn content_for(&self, key: &TemplateKey) -> Option<&str> {
        if key.kind != self.kind {
            return None;
        }
        match &key.subtype {
            Some(subtype) => self.subtype(subtype)?.content.as_deref(),
            None => self.content.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips_through_string_form() {
        let key: TemplateKey = "academic.context".parse().unwrap();
        assert_eq!(key, TemplateKey::new("academic").with_subtype("context"));
        assert_eq!(key.to_string(), "academic.context");

        let key: TemplateKey = "query".parse().unwrap();
        assert_eq!(key.subtype, None);
        assert_eq!(key.to_string(), "query");
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!("".parse::<TemplateKey>().is_err());
        assert!(".system".parse::<TemplateKey>().is_err());
        let key: TemplateKey = "prompts.".parse().unwrap();
        assert_eq!(key.subtype, None);
    }

    #[test]
    fn template_listing_parses() {
        let body = r#"[
            {"type":"prompts","name":"Prompts","subtypes":[{"name":"system","content":"You are..."}]},
            {"type":"translate","name":"Translate"}
        ]"#;
        let templates: Vec<PromptTemplate> = serde_json::from_str(body).unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].kind, "prompts");
        assert_eq!(
            templates[0].content_for(&TemplateKey::new("prompts").with_subtype("system")),
            Some("You are...")
        );
        assert!(templates[1].subtypes.is_empty());
    }
}
