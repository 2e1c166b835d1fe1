use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Manufacturer recorded when a model does not name one.
pub const UNKNOWN_MANUFACTURER: &str = "Unknown";

/// A model as offered by the listing endpoint or chosen by the user.
///
/// Every field is optional so that partial records can be validated and
/// normalized into a [`ModelInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Identifier; defaults to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Name sent to the backend as the model to use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Vendor of the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ModelDescriptor {
    /// Create a descriptor carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the manufacturer.
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A validated model selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier, unique within a catalog.
    pub id: String,

    /// Name sent to the backend.
    pub name: String,

    /// Vendor of the model.
    pub manufacturer: String,

    /// Free-form description.
    pub description: String,
}

impl ModelInfo {
    /// Create a model whose id is its name.
    pub fn new(
        name: impl Into<String>,
        manufacturer: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            manufacturer: manufacturer.into(),
            description: description.into(),
        }
    }

    /// The model choice sent with every request.
    pub fn choice(&self) -> ModelChoice {
        ModelChoice {
            manufacturer: self.manufacturer.clone(),
            model: self.name.clone(),
        }
    }
}

impl TryFrom<ModelDescriptor> for ModelInfo {
    type Error = Error;

    fn try_from(descriptor: ModelDescriptor) -> Result<Self> {
        let name = non_blank(descriptor.name)
            .ok_or_else(|| Error::invalid_model("model data is missing a name"))?;
        Ok(ModelInfo {
            id: non_blank(descriptor.id).unwrap_or_else(|| name.clone()),
            manufacturer: non_blank(descriptor.manufacturer)
                .unwrap_or_else(|| UNKNOWN_MANUFACTURER.to_string()),
            description: descriptor.description.unwrap_or_default(),
            name,
        })
    }
}

impl From<ModelInfo> for ModelDescriptor {
    fn from(model: ModelInfo) -> Self {
        ModelDescriptor {
            id: Some(model.id),
            name: Some(model.name),
            manufacturer: Some(model.manufacturer),
            description: Some(model.description),
        }
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.manufacturer)
    }
}

/// The `model_choice` object of a chat request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelChoice {
    /// Vendor of the model.
    pub manufacturer: String,

    /// Model name.
    pub model: String,
}

/// Body of the model listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    /// The offered models.
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
