//! Model and template catalogs with offline fallbacks.

use crate::client::ChatTransport;
use crate::observability::CATALOG_FALLBACKS;
use crate::types::{ModelInfo, PromptTemplate};

/// What the backend offers, as loaded at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Selectable models; never empty after loading.
    pub models: Vec<ModelInfo>,
    /// Template categories; never empty after loading.
    pub templates: Vec<PromptTemplate>,
}

impl Catalog {
    /// Find a model by id or name.
    pub fn find_model(&self, name: &str) -> Option<&ModelInfo> {
        self.models
            .iter()
            .find(|model| model.id == name || model.name == name)
    }

    /// Find a template category by its type tag.
    pub fn find_template(&self, kind: &str) -> Option<&PromptTemplate> {
        self.templates.iter().find(|template| template.kind == kind)
    }
}

/// The model a new session starts with, before any catalog is loaded.
pub fn default_model() -> ModelInfo {
    ModelInfo::new("qwen2.5:latest", "ollama", "Qwen2.5 served by Ollama")
}

/// Models offered when the listing endpoint is unavailable.
pub fn default_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::new("gpt-3.5-turbo", "openai", "GPT-3.5 Turbo"),
        ModelInfo::new("gpt-4", "openai", "GPT-4"),
    ]
}

/// Template categories offered when the listing endpoint is unavailable.
pub fn default_templates() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate::new("query", "Query"),
        PromptTemplate::new("translate", "Translate"),
        PromptTemplate::new("summarize", "Summarize"),
    ]
}

/// Load the model catalog, falling back to [`default_models`].
///
/// Listing entries without a name are skipped.
pub async fn load_models<T: ChatTransport + ?Sized>(transport: &T) -> Vec<ModelInfo> {
    let descriptors = match transport.list_models().await {
        Ok(descriptors) => descriptors,
        Err(err) => {
            CATALOG_FALLBACKS.click();
            tracing::warn!(error = %err, "failed to load models; using defaults");
            return default_models();
        }
    };
    let mut models = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        match ModelInfo::try_from(descriptor) {
            Ok(model) => models.push(model),
            Err(err) => tracing::warn!(error = %err, "skipping model listing entry"),
        }
    }
    if models.is_empty() {
        CATALOG_FALLBACKS.click();
        tracing::warn!("model listing was empty; using defaults");
        return default_models();
    }
    models
}

/// Load the template catalog, falling back to [`default_templates`].
pub async fn load_templates<T: ChatTransport + ?Sized>(transport: &T) -> Vec<PromptTemplate> {
    match transport.list_templates().await {
        Ok(templates) if !templates.is_empty() => templates,
        Ok(_) => {
            CATALOG_FALLBACKS.click();
            tracing::warn!("template listing was empty; using defaults");
            default_templates()
        }
        Err(err) => {
            CATALOG_FALLBACKS.click();
            tracing::warn!(error = %err, "failed to load templates; using defaults");
            default_templates()
        }
    }
}

/// Load both catalogs.
pub async fn load_catalog<T: ChatTransport + ?Sized>(transport: &T) -> Catalog {
    Catalog {
        models: load_models(transport).await,
        templates: load_templates(transport).await,
    }
}
