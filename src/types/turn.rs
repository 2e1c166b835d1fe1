use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};

/// The author of a turn in the transcript.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the user.
    User,

    /// Text streamed back by the model.
    Assistant,

    /// Messages produced by the client itself, such as document previews.
    System,

    /// An inline failure report.
    Error,
}

impl Role {
    /// The label used when rendering or exporting a turn.
    pub fn display_label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "AI",
            Role::System => "System",
            Role::Error => "Error",
        }
    }

    /// The role name sent over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Error => "error",
        }
    }

    /// Returns true if turns with this role are part of the conversation the
    /// model sees.
    pub fn is_conversational(&self) -> bool {
        !matches!(self, Role::Error)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a turn, unique within one session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnId(u64);

impl TurnId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    /// The numeric value of the identifier.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// A PDF document attached to the transcript for display.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfDocument {
    /// The file name the document was uploaded under.
    pub file_name: String,

    /// The raw PDF bytes.
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl PdfDocument {
    /// Create a new document from its name and bytes.
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    /// Encode the document as a `data:application/pdf;base64,` URI.
    pub fn data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.data);
        format!("data:application/pdf;base64,{encoded}")
    }
}

impl fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfDocument")
            .field("file_name", &self.file_name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// The content of a turn.
///
/// Text is always untrusted and must be rendered as text. PDF documents are a
/// separate variant so that embedding them never depends on inspecting text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TurnContent {
    /// Plain text.
    Text {
        /// The text itself.
        text: String,
    },

    /// An embedded PDF document.
    Pdf {
        /// The document.
        document: PdfDocument,
    },
}

impl TurnContent {
    /// Create text content.
    pub fn text(text: impl Into<String>) -> Self {
        TurnContent::Text { text: text.into() }
    }

    /// Returns the text, if this is text content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TurnContent::Text { text } => Some(text),
            TurnContent::Pdf { .. } => None,
        }
    }

    /// A plain-text rendering of the content, used for text exports.
    pub fn to_plain_text(&self) -> String {
        match self {
            TurnContent::Text { text } => text.clone(),
            TurnContent::Pdf { document } => format!("[PDF: {}]", document.file_name),
        }
    }
}

impl Default for TurnContent {
    fn default() -> Self {
        TurnContent::text(String::new())
    }
}

impl From<&str> for TurnContent {
    fn from(text: &str) -> Self {
        TurnContent::text(text)
    }
}

impl From<String> for TurnContent {
    fn from(text: String) -> Self {
        TurnContent::Text { text }
    }
}

impl From<PdfDocument> for TurnContent {
    fn from(document: PdfDocument) -> Self {
        TurnContent::Pdf { document }
    }
}

/// One message unit in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Identifier used to address the turn for incremental updates.
    pub id: TurnId,

    /// Who produced the turn.
    pub role: Role,

    /// What the turn says.
    pub content: TurnContent,
}

impl Turn {
    pub(crate) fn new(id: TurnId, role: Role, content: TurnContent) -> Self {
        Self { id, role, content }
    }

    /// The turn's text, or `None` for document turns.
    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }
}
