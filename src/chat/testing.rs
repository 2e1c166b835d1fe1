//! In-memory collaborators for session tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;
use futures::channel::mpsc::UnboundedReceiver;
use futures::stream;

use crate::client::{ByteStream, ChatTransport};
use crate::error::{Error, Result};
use crate::render::{NotificationLevel, PresentationSink};
use crate::types::{
    ModelDescriptor, ModelInfo, PromptTemplate, RequestEnvelope, Turn, TurnId, UploadFile,
    UploadReceipt,
};

/// A scripted answer to one chat request.
pub(crate) enum Reply {
    Chunks(Vec<Result<Bytes>>),
    Channel(UnboundedReceiver<Result<Bytes>>),
    Fail(Error),
}

impl Reply {
    pub(crate) fn text(text: &str) -> Self {
        Reply::Chunks(vec![Ok(Bytes::copy_from_slice(text.as_bytes()))])
    }
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    pub(crate) replies: Mutex<VecDeque<Reply>>,
    pub(crate) envelopes: Mutex<Vec<RequestEnvelope>>,
    pub(crate) uploads: Mutex<Vec<String>>,
    pub(crate) models: Option<Vec<ModelDescriptor>>,
    pub(crate) templates: Option<Vec<PromptTemplate>>,
    pub(crate) upload_error: Option<Error>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn envelopes(&self) -> Vec<RequestEnvelope> {
        self.envelopes.lock().unwrap().clone()
    }

    pub(crate) fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChatTransport for FakeTransport {
    async fn open_chat_stream(&self, envelope: &RequestEnvelope) -> Result<ByteStream> {
        self.envelopes.lock().unwrap().push(envelope.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Chunks(Vec::new()));
        match reply {
            Reply::Chunks(chunks) => Ok(Box::pin(stream::iter(chunks))),
            Reply::Channel(rx) => Ok(Box::pin(rx)),
            Reply::Fail(err) => Err(err),
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        self.models
            .clone()
            .ok_or_else(|| Error::connection("connection refused", None))
    }

    async fn list_templates(&self) -> Result<Vec<PromptTemplate>> {
        self.templates
            .clone()
            .ok_or_else(|| Error::server(502, None))
    }

    async fn upload_file(&self, file: &UploadFile) -> Result<UploadReceipt> {
        if let Some(err) = &self.upload_error {
            return Err(err.clone());
        }
        self.uploads
            .lock()
            .unwrap()
            .push(file.file_name().to_string());
        Ok(UploadReceipt {
            body: serde_json::json!({"filename": file.file_name()}),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SinkEvent {
    Append(Turn),
    Update(TurnId, String),
    Clear,
    Notify(NotificationLevel, String),
    Model(ModelInfo),
    Busy(bool),
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn updates(&self, id: TurnId) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Update(turn, text) if turn == id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn notifications(&self, level: NotificationLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Notify(l, text) if l == level => Some(text),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PresentationSink for RecordingSink {
    fn append_turn(&self, turn: &Turn) {
        self.push(SinkEvent::Append(turn.clone()));
    }

    fn update_turn(&self, id: TurnId, content: &str) {
        self.push(SinkEvent::Update(id, content.to_string()));
    }

    fn clear(&self) {
        self.push(SinkEvent::Clear);
    }

    fn notify(&self, level: NotificationLevel, message: &str) {
        self.push(SinkEvent::Notify(level, message.to_string()));
    }

    fn model_selected(&self, model: &ModelInfo) {
        self.push(SinkEvent::Model(model.clone()));
    }

    fn set_busy(&self, busy: bool) {
        self.push(SinkEvent::Busy(busy));
    }
}
