//! The streaming chat session.
//!
//! A [`Session`] owns one conversation: the transcript, the model, template
//! and context-file selection, and the single-flight lock that keeps at most
//! one request outstanding. Every public method takes `&self`, so a send can
//! be in flight while the front end issues other intents; those intents are
//! rejected with [`Error::Busy`] rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use futures::StreamExt;
use time::OffsetDateTime;

use crate::chat::catalog::{self, Catalog};
use crate::chat::export::{self, ExportArtifact, ExportFormat};
use crate::chat::transcript::Transcript;
use crate::client::ChatTransport;
use crate::decoder::decode_stream;
use crate::error::{Error, Result};
use crate::observability::{
    SESSION_BUSY_REJECTIONS, SESSION_ERROR_TURNS, SESSION_EXPORTS, SESSION_SENDS,
    STREAM_DURATION,
};
use crate::render::{NotificationLevel, PresentationSink};
use crate::types::{
    ModelDescriptor, ModelInfo, RequestEnvelope, Role, TemplateKey, Turn, TurnContent, TurnId,
    UploadFile, UploadReceipt,
};

/// Number of prior turns sent with each message.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

/// Where the session is in its request cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No request in flight.
    #[default]
    Idle,
    /// A chat request was issued and the response has not started.
    Sending,
    /// The response is streaming into the in-progress turn.
    Receiving,
    /// A file upload is in flight.
    Uploading,
}

/// The user's current choices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSelection {
    /// Model that answers; requests are rejected locally while unset.
    ///
    /// New sessions start with [`catalog::default_model`].
    pub model: Option<ModelInfo>,
    /// Template key; `query` is sent while unset.
    pub template: Option<TemplateKey>,
    /// Uploaded file used as context.
    pub context_file: Option<String>,
}

/// Aggregated counters for a session.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Number of turns in the transcript.
    pub turn_count: usize,
    /// Chat requests issued to the backend. Envelopes that fail local
    /// validation are not counted.
    pub requests_sent: u64,
    /// Sends that ended in an error turn.
    pub failures: u64,
}

/// Why a send never started.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Another request was in flight.
    Busy,
    /// The message was empty after trimming.
    EmptyMessage,
}

/// The result of [`Session::send_message`].
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Nothing happened.
    Rejected(RejectReason),
    /// The response streamed to completion.
    Completed {
        /// The user's turn.
        user: TurnId,
        /// The assistant's turn.
        assistant: TurnId,
    },
    /// The request or the stream failed and an error turn was appended.
    Failed {
        /// The user's turn.
        user: TurnId,
        /// What went wrong.
        error: Error,
    },
}

impl SendOutcome {
    /// Returns true if the response streamed to completion.
    pub fn is_completed(&self) -> bool {
        matches!(self, SendOutcome::Completed { .. })
    }

    /// Returns true if the send was rejected before anything happened.
    pub fn is_rejected(&self) -> bool {
        matches!(self, SendOutcome::Rejected(_))
    }
}

#[derive(Debug, Default)]
struct SessionState {
    transcript: Transcript,
    selection: SessionSelection,
    phase: SessionPhase,
    requests_sent: u64,
    failures: u64,
}

/// One chat conversation bound to a transport and a presentation sink.
pub struct Session<T: ChatTransport, S: PresentationSink> {
    transport: T,
    sink: S,
    history_window: usize,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
}

/// Holds the single-flight lock.
///
/// Dropping the guard returns the session to idle, finishes any in-progress
/// turn and releases the lock, including when a send future is dropped
/// mid-stream.
struct FlightGuard<'a, T: ChatTransport, S: PresentationSink> {
    session: &'a Session<T, S>,
}

impl<T: ChatTransport, S: PresentationSink> Drop for FlightGuard<'_, T, S> {
    fn drop(&mut self) {
        {
            let mut state = self.session.state();
            state.phase = SessionPhase::Idle;
            state.transcript.finish_in_progress();
        }
        self.session.in_flight.store(false, Ordering::Release);
        self.session.sink.set_busy(false);
    }
}

impl<T: ChatTransport, S: PresentationSink> Session<T, S> {
    /// Create an idle session with an empty transcript and the default model.
    pub fn new(transport: T, sink: S) -> Self {
        let state = SessionState {
            selection: SessionSelection {
                model: Some(catalog::default_model()),
                ..SessionSelection::default()
            },
            ..SessionState::default()
        };
        Self {
            transport,
            sink,
            history_window: DEFAULT_HISTORY_WINDOW,
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Sets how many prior turns are sent with each message.
    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    /// The transport this session talks to.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// How many prior turns are sent with each message.
    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Where the session is in its request cycle.
    pub fn phase(&self) -> SessionPhase {
        self.state().phase
    }

    /// Returns true while a request holds the single-flight lock.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The current selection.
    pub fn selection(&self) -> SessionSelection {
        self.state().selection.clone()
    }

    /// A copy of the transcript.
    pub fn turns(&self) -> Vec<Turn> {
        self.state().transcript.turns().to_vec()
    }

    /// Session counters.
    pub fn stats(&self) -> SessionStats {
        let state = self.state();
        SessionStats {
            turn_count: state.transcript.len(),
            requests_sent: state.requests_sent,
            failures: state.failures,
        }
    }

    /// Load the catalogs and select the first model and template category.
    ///
    /// Listing failures fall back to built-in catalogs, so this never fails.
    pub async fn initialize(&self) -> Catalog {
        let catalog = catalog::load_catalog(&self.transport).await;
        tracing::info!(
            models = catalog.models.len(),
            templates = catalog.templates.len(),
            "catalog loaded"
        );
        if let Some(model) = catalog.models.first() {
            let _ = self.set_model(model.clone().into());
        }
        if let Some(template) = catalog.templates.first() {
            self.set_template(Some(template.key()));
        }
        catalog
    }

    /// Select the model that answers subsequent messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidModel`] if `model` has no name; the previous
    /// selection is kept.
    pub fn set_model(&self, model: ModelDescriptor) -> Result<ModelInfo> {
        match ModelInfo::try_from(model) {
            Ok(model) => {
                self.state().selection.model = Some(model.clone());
                tracing::info!(model = %model.name, manufacturer = %model.manufacturer, "model selected");
                self.sink.model_selected(&model);
                self.sink
                    .notify(NotificationLevel::Success, &format!("Model set to {model}"));
                Ok(model)
            }
            Err(err) => {
                tracing::warn!(error = %err, "rejected model selection");
                self.sink.notify(
                    NotificationLevel::Error,
                    &format!("Failed to set model: {err}"),
                );
                Err(err)
            }
        }
    }

    /// Select the prompt template, or clear the selection with `None`.
    pub fn set_template(&self, template: Option<TemplateKey>) {
        let message = match &template {
            Some(key) => format!("Template set to {key}"),
            None => "Template cleared".to_string(),
        };
        tracing::info!(template = ?template.as_ref().map(TemplateKey::to_string), "template selected");
        self.state().selection.template = template;
        self.sink.notify(NotificationLevel::Info, &message);
    }

    /// Point the conversation at an uploaded file, or at none.
    ///
    /// Changing the context starts a new conversation, so the transcript is
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] while a request is in flight.
    pub fn set_context_file(&self, reference: Option<String>) -> Result<()> {
        let _guard = self.try_acquire("change the context file")?;
        self.apply_context_file(reference);
        Ok(())
    }

    /// Empty the transcript.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] while a request is in flight.
    pub fn clear_transcript(&self) -> Result<()> {
        let _guard = self.try_acquire("clear the transcript")?;
        self.state().transcript.clear();
        tracing::info!("transcript cleared");
        self.sink.clear();
        self.sink
            .notify(NotificationLevel::Success, "Chat history cleared");
        Ok(())
    }

    /// Render the transcript in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] while a request is in flight.
    pub fn export_transcript(&self, format: ExportFormat) -> Result<ExportArtifact> {
        let _guard = self.try_acquire("export the transcript")?;
        let turns = self.turns();
        match export::export(&turns, format, OffsetDateTime::now_utc()) {
            Ok(artifact) => {
                SESSION_EXPORTS.click();
                tracing::info!(file = %artifact.file_name, turns = turns.len(), "transcript exported");
                self.sink.notify(
                    NotificationLevel::Success,
                    &format!("Chat history exported to {}", artifact.file_name),
                );
                Ok(artifact)
            }
            Err(err) => {
                tracing::error!(error = %err, "export failed");
                self.sink.notify(
                    NotificationLevel::Error,
                    &format!("Failed to export chat history: {err}"),
                );
                Err(err)
            }
        }
    }

    /// Upload `file` and make it the context of a fresh conversation.
    ///
    /// PDFs are also shown in the transcript as a system turn.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] while a request is in flight, or the transport's
    /// error if the upload fails.
    pub async fn upload_context_file(&self, file: UploadFile) -> Result<UploadReceipt> {
        let _guard = self.try_acquire("upload a file")?;
        self.state().phase = SessionPhase::Uploading;
        self.sink.set_busy(true);
        self.sink.notify(
            NotificationLevel::Info,
            &format!("Uploading {}", file.file_name()),
        );
        match self.transport.upload_file(&file).await {
            Ok(receipt) => {
                tracing::info!(file = %file.file_name(), "file uploaded");
                self.apply_context_file(Some(file.file_name().to_string()));
                if let Some(document) = file.pdf_preview() {
                    self.append_turn(Role::System, document.into());
                }
                Ok(receipt)
            }
            Err(err) => {
                tracing::error!(file = %file.file_name(), error = %err, "upload failed");
                self.sink.notify(
                    NotificationLevel::Error,
                    &format!("Failed to upload {}: {err}", file.file_name()),
                );
                Err(err)
            }
        }
    }

    /// Send `text` and stream the reply into the transcript.
    ///
    /// Empty messages and messages sent while another request is in flight
    /// are rejected without touching the transcript or the transport. Request
    /// and stream failures end up as an error turn.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let message = text.trim();
        if message.is_empty() {
            tracing::debug!("ignoring empty message");
            return SendOutcome::Rejected(RejectReason::EmptyMessage);
        }
        let Ok(_guard) = self.try_acquire("send a message") else {
            return SendOutcome::Rejected(RejectReason::Busy);
        };
        SESSION_SENDS.click();
        self.sink.set_busy(true);
        self.state().phase = SessionPhase::Sending;

        let user = self.append_turn(Role::User, TurnContent::text(message));
        let envelope = self.build_envelope(message);
        tracing::info!(
            model = %envelope.model_choice.model,
            prompt_type = %envelope.prompt_type,
            history = envelope.history.len(),
            "sending message"
        );

        let sent = self.transport.send_chat(&envelope).await;
        if !matches!(&sent, Err(err) if err.is_invalid_request()) {
            self.state().requests_sent += 1;
        }
        let byte_stream = match sent {
            Ok(byte_stream) => byte_stream,
            Err(err) => {
                let message = format!("Failed to send message: {err}");
                return self.fail(user, message, err);
            }
        };

        let (assistant, turn) = {
            let mut state = self.state();
            state.phase = SessionPhase::Receiving;
            let id = state.transcript.begin_assistant();
            (id, Turn::new(id, Role::Assistant, TurnContent::default()))
        };
        self.sink.append_turn(&turn);

        let started = Instant::now();
        let mut fragments = Box::pin(decode_stream(byte_stream));
        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    reply.push_str(&text);
                    let updated = self
                        .state()
                        .transcript
                        .update_in_progress(assistant, &reply);
                    if let Err(err) = updated {
                        tracing::error!(error = %err, "dropping streamed text");
                        break;
                    }
                    self.sink.update_turn(assistant, &reply);
                }
                Err(err) => {
                    STREAM_DURATION.add(started.elapsed().as_secs_f64());
                    let message = format!("Error while reading response: {err}");
                    return self.fail(user, message, err);
                }
            }
        }
        STREAM_DURATION.add(started.elapsed().as_secs_f64());
        tracing::info!(bytes = reply.len(), "response complete");
        SendOutcome::Completed { user, assistant }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn try_acquire(&self, operation: &str) -> Result<FlightGuard<'_, T, S>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            SESSION_BUSY_REJECTIONS.click();
            tracing::debug!(operation, "rejected while a request is in flight");
            return Err(Error::busy(operation));
        }
        Ok(FlightGuard { session: self })
    }

    fn append_turn(&self, role: Role, content: TurnContent) -> TurnId {
        let (id, turn) = {
            let mut state = self.state();
            let id = state.transcript.append(role, content.clone());
            (id, Turn::new(id, role, content))
        };
        self.sink.append_turn(&turn);
        id
    }

    fn apply_context_file(&self, reference: Option<String>) {
        {
            let mut state = self.state();
            state.selection.context_file = reference.clone();
            state.transcript.clear();
        }
        tracing::info!(context_file = ?reference, "context file changed");
        self.sink.clear();
        let message = match &reference {
            Some(name) => format!("Using {name} as context"),
            None => "Context file cleared".to_string(),
        };
        self.sink.notify(NotificationLevel::Success, &message);
    }

    fn build_envelope(&self, message: &str) -> RequestEnvelope {
        let state = self.state();
        let choice = state
            .selection
            .model
            .as_ref()
            .map(ModelInfo::choice)
            .unwrap_or_default();
        RequestEnvelope::new(message, choice)
            .with_history(state.transcript.history(self.history_window))
            .with_template(state.selection.template.as_ref())
            .with_context_file(state.selection.context_file.clone())
    }

    fn fail(&self, user: TurnId, message: String, error: Error) -> SendOutcome {
        tracing::error!(error = %error, "send failed");
        SESSION_ERROR_TURNS.click();
        self.state().failures += 1;
        self.append_turn(Role::Error, TurnContent::text(message));
        SendOutcome::Failed { user, error }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use futures::channel::mpsc;

    use super::*;
    use crate::chat::testing::{FakeTransport, RecordingSink, Reply, SinkEvent};
    use crate::types::{ModelChoice, PromptTemplate};

    type TestSession = Session<Arc<FakeTransport>, Arc<RecordingSink>>;

    fn session_with(transport: FakeTransport) -> (TestSession, Arc<FakeTransport>, Arc<RecordingSink>) {
        let transport = Arc::new(transport);
        let sink = Arc::new(RecordingSink::new());
        let session = Session::new(Arc::clone(&transport), Arc::clone(&sink));
        session
            .set_model(ModelDescriptor::named("qwen2.5:latest").with_manufacturer("ollama"))
            .unwrap();
        (session, transport, sink)
    }

    fn session() -> (TestSession, Arc<FakeTransport>, Arc<RecordingSink>) {
        session_with(FakeTransport::new())
    }

    fn roles(session: &TestSession) -> Vec<Role> {
        session.turns().iter().map(|turn| turn.role).collect()
    }

    #[tokio::test]
    async fn send_appends_user_then_assistant() {
        let (session, transport, sink) = session();
        transport.reply(Reply::Chunks(vec![
            Ok(Bytes::from_static(b"Hel")),
            Ok(Bytes::from_static(b"lo")),
        ]));

        let outcome = session.send_message("  hi  ").await;
        let SendOutcome::Completed { user, assistant } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(roles(&session), vec![Role::User, Role::Assistant]);
        let turns = session.turns();
        assert_eq!(turns[0].id, user);
        assert_eq!(turns[0].text(), Some("hi"));
        assert_eq!(turns[1].id, assistant);
        assert_eq!(turns[1].text(), Some("Hello"));

        assert_eq!(sink.updates(assistant), vec!["Hel", "Hello"]);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!session.is_busy());

        let envelopes = transport.envelopes();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].message, "hi");
        assert_eq!(
            envelopes[0].model_choice,
            ModelChoice {
                manufacturer: "ollama".to_string(),
                model: "qwen2.5:latest".to_string(),
            }
        );
        assert_eq!(envelopes[0].prompt_type, "query");
    }

    #[tokio::test]
    async fn empty_message_is_ignored() {
        let (session, transport, sink) = session();
        let before = sink.events().len();
        let outcome = session.send_message("   ").await;
        assert!(matches!(outcome, SendOutcome::Rejected(RejectReason::EmptyMessage)));
        assert!(session.turns().is_empty());
        assert!(transport.envelopes().is_empty());
        assert_eq!(sink.events().len(), before);
    }

    #[tokio::test]
    async fn history_carries_recent_turns_and_selection() {
        let (session, transport, _sink) = session();
        let session = session.with_history_window(3);
        session.set_template(Some("academic.context".parse().unwrap()));
        transport.reply(Reply::text("one"));
        transport.reply(Reply::text("two"));

        assert!(session.send_message("first").await.is_completed());
        assert!(session.send_message("second").await.is_completed());

        let envelopes = transport.envelopes();
        let history: Vec<(Role, String)> = envelopes[1]
            .history
            .iter()
            .map(|entry| (entry.role, entry.content.clone()))
            .collect();
        assert_eq!(
            history,
            vec![
                (Role::User, "first".to_string()),
                (Role::Assistant, "one".to_string()),
                (Role::User, "second".to_string()),
            ]
        );
        assert_eq!(envelopes[1].prompt_type, "academic.context");
        assert_eq!(session.stats().requests_sent, 2);
    }

    #[tokio::test]
    async fn server_error_becomes_error_turn_and_session_recovers() {
        let (session, transport, _sink) = session();
        transport.reply(Reply::Fail(Error::server(500, None)));
        transport.reply(Reply::text("fine"));

        let outcome = session.send_message("hi").await;
        let SendOutcome::Failed { error, .. } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(error.status_code(), Some(500));
        assert_eq!(roles(&session), vec![Role::User, Role::Error]);
        let message = session.turns()[1].text().unwrap().to_string();
        assert!(message.starts_with("Failed to send message:"));
        assert!(message.contains("500"));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.stats().failures, 1);
        assert_eq!(session.stats().requests_sent, 1);

        assert!(session.send_message("again").await.is_completed());
        assert_eq!(transport.envelopes().len(), 2);
    }

    #[tokio::test]
    async fn envelope_failing_validation_becomes_error_turn() {
        let (session, transport, _sink) = session();
        session.state().selection.model = None;

        let outcome = session.send_message("hi").await;
        let SendOutcome::Failed { error, .. } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(error.is_invalid_request());
        assert_eq!(roles(&session), vec![Role::User, Role::Error]);
        let message = session.turns()[1].text().unwrap().to_string();
        assert!(message.starts_with("Failed to send message: Invalid request:"));
        assert!(transport.envelopes().is_empty());
        assert_eq!(session.stats().requests_sent, 0);
        assert_eq!(session.stats().failures, 1);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn new_session_uses_default_model() {
        let transport = Arc::new(FakeTransport::new());
        let session = Session::new(Arc::clone(&transport), Arc::new(RecordingSink::new()));
        assert_eq!(session.selection().model, Some(catalog::default_model()));

        assert!(session.send_message("hi").await.is_completed());
        assert_eq!(
            transport.envelopes()[0].model_choice,
            ModelChoice {
                manufacturer: "ollama".to_string(),
                model: "qwen2.5:latest".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn stream_failure_keeps_partial_reply() {
        let (session, transport, _sink) = session();
        transport.reply(Reply::Chunks(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(Error::connection("reset by peer", None)),
        ]));

        let outcome = session.send_message("hi").await;
        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        let turns = session.turns();
        assert_eq!(roles(&session), vec![Role::User, Role::Assistant, Role::Error]);
        assert_eq!(turns[1].text(), Some("partial"));
        assert!(turns[2].text().unwrap().starts_with("Error while reading response:"));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn multibyte_characters_split_across_chunks() {
        let (session, transport, sink) = session();
        let bytes = "你好".as_bytes();
        transport.reply(Reply::Chunks(vec![
            Ok(Bytes::copy_from_slice(&bytes[..2])),
            Ok(Bytes::copy_from_slice(&bytes[2..4])),
            Ok(Bytes::copy_from_slice(&bytes[4..])),
        ]));
        let SendOutcome::Completed { assistant, .. } = session.send_message("hi").await else {
            panic!("expected completion");
        };
        assert_eq!(sink.updates(assistant), vec!["你", "你好"]);
    }

    #[tokio::test]
    async fn clear_during_send_is_rejected() {
        let (session, transport, _sink) = session();
        let (tx, rx) = mpsc::unbounded();
        transport.reply(Reply::Channel(rx));

        let session = &session;
        let probe = async move {
            while !session.is_busy() {
                tokio::task::yield_now().await;
            }
            let before = session.turns().len();
            assert!(session.clear_transcript().unwrap_err().is_busy());
            assert!(session.set_context_file(Some("a.pdf".to_string())).unwrap_err().is_busy());
            assert!(matches!(
                session.send_message("again").await,
                SendOutcome::Rejected(RejectReason::Busy)
            ));
            assert_eq!(session.turns().len(), before);
            tx.unbounded_send(Ok(Bytes::from_static(b"yo"))).unwrap();
        };

        let (outcome, ()) = tokio::join!(session.send_message("hi"), probe);
        assert!(outcome.is_completed());
        assert_eq!(roles(session), vec![Role::User, Role::Assistant]);
        assert_eq!(session.turns()[1].text(), Some("yo"));
        assert_eq!(transport.envelopes().len(), 1);
        assert!(session.selection().context_file.is_none());
    }

    #[tokio::test]
    async fn dropping_a_send_releases_the_lock() {
        let (session, transport, _sink) = session();
        let (tx, rx) = mpsc::unbounded();
        transport.reply(Reply::Channel(rx));
        tx.unbounded_send(Ok(Bytes::from_static(b"par"))).unwrap();
        {
            let send = session.send_message("hi");
            tokio::pin!(send);
            assert!(futures::poll!(send.as_mut()).is_pending());
            assert_eq!(session.phase(), SessionPhase::Receiving);
        }
        assert!(!session.is_busy());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.turns()[1].text(), Some("par"));

        session.clear_transcript().unwrap();
        assert!(session.turns().is_empty());
    }

    #[test]
    fn set_model_applies_defaults() {
        let (session, _transport, sink) = session();
        let model = session.set_model(ModelDescriptor::named("gpt-4")).unwrap();
        assert_eq!(model.id, "gpt-4");
        assert_eq!(model.name, "gpt-4");
        assert_eq!(model.manufacturer, "Unknown");
        assert_eq!(session.selection().model, Some(model.clone()));
        assert!(sink.events().contains(&SinkEvent::Model(model)));
    }

    #[test]
    fn invalid_model_keeps_previous_selection() {
        let (session, _transport, sink) = session();
        let before = session.selection().model;
        let err = session.set_model(ModelDescriptor::default()).unwrap_err();
        assert!(err.is_invalid_model());
        assert_eq!(session.selection().model, before);
        assert_eq!(sink.notifications(NotificationLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn export_then_clear() {
        let (session, transport, _sink) = session();
        transport.reply(Reply::text("yo"));
        session.send_message("hi").await;

        let artifact = session.export_transcript(ExportFormat::Text).unwrap();
        assert_eq!(artifact.body, "User: hi\n\nAI: yo");
        assert!(artifact.file_name.starts_with("chat_export_"));
        assert!(artifact.file_name.ends_with(".txt"));

        session.clear_transcript().unwrap();
        let artifact = session.export_transcript(ExportFormat::Text).unwrap();
        assert_eq!(artifact.body, "");
    }

    #[tokio::test]
    async fn context_file_change_clears_transcript() {
        let (session, transport, sink) = session();
        transport.reply(Reply::text("yo"));
        session.send_message("hi").await;

        session.set_context_file(Some("paper.pdf".to_string())).unwrap();
        assert!(session.turns().is_empty());
        assert!(sink.events().contains(&SinkEvent::Clear));

        transport.reply(Reply::text("ok"));
        session.send_message("summarize").await;
        assert_eq!(
            transport.envelopes()[1].pdf_context.as_deref(),
            Some("paper.pdf")
        );
    }

    #[tokio::test]
    async fn pdf_upload_sets_context_and_shows_document() {
        let (session, transport, _sink) = session();
        let file = UploadFile::new("paper.pdf", b"%PDF-1.4".to_vec()).unwrap();
        session.upload_context_file(file).await.unwrap();

        assert_eq!(transport.uploads(), vec!["paper.pdf".to_string()]);
        assert_eq!(session.selection().context_file.as_deref(), Some("paper.pdf"));
        let turns = session.turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::System);
        assert!(matches!(&turns[0].content, TurnContent::Pdf { document } if document.file_name == "paper.pdf"));
        assert!(!session.is_busy());

        // Document turns are not sent as history.
        transport.reply(Reply::text("ok"));
        session.send_message("summarize").await;
        assert_eq!(transport.envelopes()[0].history.len(), 1);
    }

    #[tokio::test]
    async fn failed_upload_notifies_and_keeps_context() {
        let transport = FakeTransport {
            upload_error: Some(Error::server(413, Some("too large".to_string()))),
            ..FakeTransport::new()
        };
        let (session, _transport, sink) = session_with(transport);
        let file = UploadFile::new("notes.txt", b"notes".to_vec()).unwrap();
        assert!(session.upload_context_file(file).await.is_err());
        assert!(session.selection().context_file.is_none());
        let errors = sink.notifications(NotificationLevel::Error);
        assert_eq!(errors, vec!["Failed to upload notes.txt: too large".to_string()]);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn initialize_selects_first_model_and_template() {
        let transport = FakeTransport {
            models: Some(vec![
                ModelDescriptor::default(),
                ModelDescriptor::named("deepseek-chat").with_manufacturer("deepseek"),
            ]),
            templates: Some(vec![PromptTemplate::new("academic", "Academic")]),
            ..FakeTransport::new()
        };
        let transport = Arc::new(transport);
        let session = Session::new(Arc::clone(&transport), Arc::new(RecordingSink::new()));
        let catalog = session.initialize().await;
        assert_eq!(catalog.models.len(), 1);
        let selection = session.selection();
        assert_eq!(selection.model.unwrap().name, "deepseek-chat");
        assert_eq!(selection.template, Some(TemplateKey::new("academic")));
    }

    #[tokio::test]
    async fn initialize_falls_back_when_listing_fails() {
        let session = Session::new(FakeTransport::new(), RecordingSink::new());
        let catalog = session.initialize().await;
        assert_eq!(catalog, Catalog {
            models: catalog::default_models(),
            templates: catalog::default_templates(),
        });
        assert_eq!(session.selection().model.unwrap().name, "gpt-3.5-turbo");
        assert_eq!(session.selection().template, Some(TemplateKey::new("query")));
    }
}
