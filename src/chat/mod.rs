//! Chat sessions against a streaming chat backend.
//!
//! This module provides the session state machine and what surrounds it:
//!
//! - [`Session`]: owns the transcript, the selection and the single-flight lock
//! - [`Transcript`]: ordered turns with one streamable tail
//! - [`catalog`]: model and template listings with fallbacks
//! - [`export`]: text and HTML renderings of a transcript
//! - [`ChatConfig`] and [`ChatCommand`]: configuration and slash commands for
//!   the terminal front end

pub mod catalog;
mod commands;
mod config;
pub mod export;
mod session;
mod transcript;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{Catalog, default_model, default_models, default_templates};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use export::{ExportArtifact, ExportFormat};
pub use session::{
    DEFAULT_HISTORY_WINDOW, RejectReason, SendOutcome, Session, SessionPhase, SessionSelection,
    SessionStats,
};
pub use transcript::Transcript;
