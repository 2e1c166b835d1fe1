//! Configuration types for the chat application.
//!
//! Command-line arguments are parsed with `arrrg`. They may point at a YAML
//! file holding a [`ChatConfig`]; values given on the command line win over
//! values from the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::chat::session::DEFAULT_HISTORY_WINDOW;
use crate::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};
use crate::types::{ModelDescriptor, TemplateKey};

/// Directory exports are written to by default.
const DEFAULT_EXPORT_DIR: &str = ".";

/// Command-line arguments for the parley-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the chat backend.
    #[arrrg(optional, "Backend base URL (default: http://localhost:8000/api/v1/)", "URL")]
    pub base_url: Option<String>,

    /// Model to select after startup.
    #[arrrg(optional, "Model to use (default: first model offered)", "MODEL")]
    pub model: Option<String>,

    /// Manufacturer of the model given with --model.
    #[arrrg(optional, "Manufacturer of --model", "MANUFACTURER")]
    pub manufacturer: Option<String>,

    /// Template key to select after startup.
    #[arrrg(optional, "Prompt template as type or type.subtype", "TEMPLATE")]
    pub template: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "Read configuration from a YAML file", "PATH")]
    pub config: Option<String>,

    /// Number of prior turns sent with each message.
    #[arrrg(optional, "Prior turns sent with each message (default: 5)", "TURNS")]
    pub history_window: Option<u32>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 300)", "SECONDS")]
    pub timeout_secs: Option<u32>,

    /// Where exports are written.
    #[arrrg(optional, "Directory for exported transcripts (default: .)", "DIR")]
    pub export_dir: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Resolved configuration for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL of the chat backend.
    pub base_url: String,

    /// Model to select after startup; `None` keeps the first model offered.
    pub model: Option<String>,

    /// Manufacturer of `model`.
    pub manufacturer: Option<String>,

    /// Template key to select after startup.
    pub template: Option<String>,

    /// Number of prior turns sent with each message.
    pub history_window: usize,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Where exports are written.
    pub export_dir: PathBuf,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: http://localhost:8000/api/v1/
    /// - Model and template: the first ones offered by the backend
    /// - History window: 5 turns
    /// - Timeout: 300 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: None,
            manufacturer: None,
            template: None,
            history_window: DEFAULT_HISTORY_WINDOW,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            use_color: true,
        }
    }

    /// Parse a YAML configuration document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::from_yaml_str(&content)
    }

    /// Resolve the configuration for `args`: the file named by `--config`, if
    /// any, overridden by the remaining arguments.
    pub fn load(args: ChatArgs) -> Result<Self> {
        let base = match &args.config {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::new(),
        };
        Ok(base.apply_args(args))
    }

    /// Override fields with the values present in `args`.
    pub fn apply_args(mut self, args: ChatArgs) -> Self {
        if let Some(base_url) = args.base_url {
            self.base_url = base_url;
        }
        if let Some(model) = args.model {
            self.model = Some(model);
            self.manufacturer = args.manufacturer;
        } else if args.manufacturer.is_some() {
            self.manufacturer = args.manufacturer;
        }
        if let Some(template) = args.template {
            self.template = Some(template);
        }
        if let Some(history_window) = args.history_window {
            self.history_window = history_window as usize;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.timeout_secs = u64::from(timeout_secs);
        }
        if let Some(export_dir) = args.export_dir {
            self.export_dir = PathBuf::from(export_dir);
        }
        if args.no_color {
            self.use_color = false;
        }
        self
    }

    /// Sets the backend base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the model to select after startup.
    pub fn with_model(mut self, model: impl Into<String>, manufacturer: Option<String>) -> Self {
        self.model = Some(model.into());
        self.manufacturer = manufacturer;
        self
    }

    /// Sets the template to select after startup.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Sets the number of prior turns sent with each message.
    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the export directory.
    pub fn with_export_dir(mut self, export_dir: impl Into<PathBuf>) -> Self {
        self.export_dir = export_dir.into();
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured model, if one was named.
    pub fn model_descriptor(&self) -> Option<ModelDescriptor> {
        let model = self.model.as_ref()?;
        let descriptor = ModelDescriptor::named(model.clone());
        Some(match &self.manufacturer {
            Some(manufacturer) => descriptor.with_manufacturer(manufacturer.clone()),
            None => descriptor,
        })
    }

    /// The configured template key, if one was named.
    pub fn template_key(&self) -> Result<Option<TemplateKey>> {
        self.template
            .as_deref()
            .map(|template| template.parse::<TemplateKey>())
            .transpose()
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig::new().apply_args(args)
    }
}
