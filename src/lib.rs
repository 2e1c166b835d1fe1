// Public modules
pub mod chat;
pub mod client;
pub mod decoder;
pub mod error;
pub mod observability;
pub mod render;
pub mod types;

// Re-exports
pub use chat::{
    Catalog, ChatArgs, ChatCommand, ChatConfig, ExportArtifact, ExportFormat, RejectReason,
    SendOutcome, Session, SessionPhase, SessionSelection, SessionStats, Transcript,
};
pub use client::{ByteStream, ChatClient, ChatTransport, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use decoder::{StreamDecoder, decode_stream};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{NotificationLevel, PlainTextSink, PresentationSink};
pub use types::*;
