//! Data types shared by the transport, the session and the front end.

mod envelope;
mod model;
mod template;
mod turn;
mod upload;

pub use envelope::{HistoryEntry, RequestEnvelope};
pub use model::{ModelChoice, ModelDescriptor, ModelInfo, ModelList, UNKNOWN_MANUFACTURER};
pub use template::{
    DEFAULT_PROMPT_TYPE, PromptTemplate, TemplateKey, TemplateSubtype,
};
pub use turn::{PdfDocument, Role, Turn, TurnContent, TurnId};
pub use upload::{FileKind, MAX_UPLOAD_BYTES, UploadFile, UploadReceipt};
