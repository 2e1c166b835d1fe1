use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{DEFAULT_PROMPT_TYPE, ModelChoice, Role, TemplateKey};

/// A prior turn as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Role of the turn.
    pub role: Role,

    /// Text of the turn.
    pub content: String,
}

impl HistoryEntry {
    /// Create a new history entry.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The outbound payload for one user message.
///
/// Envelopes are built fresh for every send and are not modified after they
/// have been handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// The user's message.
    pub message: String,

    /// Which model should answer.
    pub model_choice: ModelChoice,

    /// The most recent turns of the conversation, oldest first.
    pub history: Vec<HistoryEntry>,

    /// Template tag selecting the server-side prompt.
    pub prompt_type: String,

    /// Uploaded file the server should use as context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_context: Option<String>,
}

impl RequestEnvelope {
    /// Create an envelope with no history, the default prompt type and no
    /// context file.
    pub fn new(message: impl Into<String>, model_choice: ModelChoice) -> Self {
        Self {
            message: message.into(),
            model_choice,
            history: Vec::new(),
            prompt_type: DEFAULT_PROMPT_TYPE.to_string(),
            pdf_context: None,
        }
    }

    /// Sets the history window.
    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    /// Sets the prompt type from an optional template key.
    pub fn with_template(mut self, template: Option<&TemplateKey>) -> Self {
        self.prompt_type = template
            .map(TemplateKey::to_string)
            .unwrap_or_else(|| DEFAULT_PROMPT_TYPE.to_string());
        self
    }

    /// Sets the context file reference.
    pub fn with_context_file(mut self, context_file: Option<String>) -> Self {
        self.pdf_context = context_file;
        self
    }

    /// Check the envelope before it goes over the wire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the message, the manufacturer or the
    /// model name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(Error::invalid_request(
                "message must not be empty",
                Some("message".to_string()),
            ));
        }
        if self.model_choice.manufacturer.trim().is_empty() {
            return Err(Error::invalid_request(
                "model choice is missing a manufacturer",
                Some("model_choice.manufacturer".to_string()),
            ));
        }
        if self.model_choice.model.trim().is_empty() {
            return Err(Error::invalid_request(
                "model choice is missing a model",
                Some("model_choice.model".to_string()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice() -> ModelChoice {
        ModelChoice {
            manufacturer: "ollama".to_string(),
            model: "qwen2.5:latest".to_string(),
        }
    }

    #[test]
    fn serializes_wire_shape() {
        let envelope = RequestEnvelope::new("hello", choice())
            .with_history(vec![HistoryEntry::new(Role::User, "hello")])
            .with_template(Some(&TemplateKey::new("academic").with_subtype("value")))
            .with_context_file(Some("paper.pdf".to_string()));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "hello",
                "model_choice": {"manufacturer": "ollama", "model": "qwen2.5:latest"},
                "history": [{"role": "user", "content": "hello"}],
                "prompt_type": "academic.value",
                "pdf_context": "paper.pdf"
            })
        );
    }

    #[test]
    fn context_file_is_omitted_when_absent() {
        let envelope = RequestEnvelope::new("hello", choice()).with_template(None);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["prompt_type"], "query");
        assert!(json.get("pdf_context").is_none());
    }

    #[test]
    fn validation_rejects_missing_fields() {
        assert!(RequestEnvelope::new("hi", choice()).validate().is_ok());
        assert!(
            RequestEnvelope::new("   ", choice())
                .validate()
                .unwrap_err()
                .is_invalid_request()
        );

        let mut no_manufacturer = choice();
        no_manufacturer.manufacturer.clear();
        assert!(RequestEnvelope::new("hi", no_manufacturer).validate().is_err());

        let mut no_model = choice();
        no_model.model.clear();
        assert!(RequestEnvelope::new("hi", no_model).validate().is_err());
    }
}
