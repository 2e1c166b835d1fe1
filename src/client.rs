//! HTTP transport for the chat backend.
//!
//! [`ChatTransport`] is the seam the session depends on; [`ChatClient`] is the
//! reqwest implementation of it.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{self, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, CLIENT_UPLOADS,
    STREAM_BYTES, STREAM_CHUNKS, STREAM_ERRORS,
};
use crate::types::{
    ModelDescriptor, ModelList, PromptTemplate, RequestEnvelope, UploadFile, UploadReceipt,
};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1/";
/// Timeout used when none is configured. It covers the whole streamed response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// An open response body, drained incrementally by the caller.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The endpoints a chat session needs from its backend.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Validate `envelope` and open a streaming chat response.
    ///
    /// Invalid envelopes fail with [`Error::InvalidRequest`] before anything is
    /// sent.
    async fn send_chat(&self, envelope: &RequestEnvelope) -> Result<ByteStream> {
        envelope.validate()?;
        self.open_chat_stream(envelope).await
    }

    /// Issue the chat request for an already validated envelope.
    async fn open_chat_stream(&self, envelope: &RequestEnvelope) -> Result<ByteStream>;

    /// Fetch the models the backend offers.
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>>;

    /// Fetch the prompt template categories the backend offers.
    async fn list_templates(&self) -> Result<Vec<PromptTemplate>>;

    /// Upload a file to be used as conversation context.
    async fn upload_file(&self, file: &UploadFile) -> Result<UploadReceipt>;
}

#[async_trait::async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send_chat(&self, envelope: &RequestEnvelope) -> Result<ByteStream> {
        (**self).send_chat(envelope).await
    }

    async fn open_chat_stream(&self, envelope: &RequestEnvelope) -> Result<ByteStream> {
        (**self).open_chat_stream(envelope).await
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        (**self).list_models().await
    }

    async fn list_templates(&self) -> Result<Vec<PromptTemplate>> {
        (**self).list_templates().await
    }

    async fn upload_file(&self, file: &UploadFile) -> Result<UploadReceipt> {
        (**self).upload_file(file).await
    }
}

/// Client for the chat backend's HTTP API.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl ChatClient {
    /// Create a client for `base_url`, or [`DEFAULT_BASE_URL`].
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a client with custom settings.
    pub fn with_options(base_url: Option<&str>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = parse_base_url(base_url.unwrap_or(DEFAULT_BASE_URL))?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = request.send().await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        let response = result.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            Error::from_reqwest(e, Some(self.timeout.as_secs_f64()))
        })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Turn a non-success response into an [`Error::Server`].
    ///
    /// The server message is taken from a JSON `message` field, or from a
    /// string `detail` field; anything else yields a status-only error.
    async fn process_error_response(response: Response) -> Error {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: Option<String>,
            detail: Option<serde_json::Value>,
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|parsed| {
                parsed.message.or_else(|| match parsed.detail {
                    Some(serde_json::Value::String(detail)) => Some(detail),
                    _ => None,
                })
            })
            .filter(|message| !message.trim().is_empty());
        tracing::debug!(status, ?message, "server returned an error status");
        Error::server(status, message)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })
    }
}

#[async_trait::async_trait]
impl ChatTransport for ChatClient {
    async fn open_chat_stream(&self, envelope: &RequestEnvelope) -> Result<ByteStream> {
        let url = self.endpoint("chat/stream")?;
        tracing::debug!(
            %url,
            model = %envelope.model_choice.model,
            prompt_type = %envelope.prompt_type,
            history = envelope.history.len(),
            "sending chat message"
        );
        let request = self
            .client
            .post(url)
            .header(header::ACCEPT, HeaderValue::from_static("text/plain"))
            .json(envelope);
        let response = self.execute(request).await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Error::no_response_body(status.as_u16()));
        }

        let stream = response.bytes_stream().map(|chunk| match chunk {
            Ok(bytes) => {
                STREAM_CHUNKS.click();
                STREAM_BYTES.count(bytes.len() as u64);
                Ok(bytes)
            }
            Err(e) => {
                STREAM_ERRORS.click();
                Err(Error::stream_read(
                    format!("Error in HTTP stream: {e}"),
                    Some(Box::new(e)),
                ))
            }
        });
        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let url = self.endpoint("models")?;
        let response = self.execute(self.client.get(url)).await?;
        let list: ModelList = Self::read_json(response).await?;
        Ok(list.models)
    }

    async fn list_templates(&self) -> Result<Vec<PromptTemplate>> {
        let url = self.endpoint("prompt/templates")?;
        let response = self.execute(self.client.get(url)).await?;
        Self::read_json(response).await
    }

    async fn upload_file(&self, file: &UploadFile) -> Result<UploadReceipt> {
        let url = self.endpoint("upload")?;
        let part = Part::bytes(file.data().to_vec())
            .file_name(file.file_name().to_string())
            .mime_str(file.kind().mime_type())
            .map_err(|e| Error::http_client(format!("Invalid MIME type: {e}"), Some(Box::new(e))))?;
        let form = Form::new().part("file", part);
        CLIENT_UPLOADS.click();
        tracing::info!(%url, file = file.file_name(), bytes = file.data().len(), "uploading file");
        let response = self.execute(self.client.post(url).multipart(form)).await?;
        let body = response.text().await.map_err(|e| {
            Error::http_client(format!("Failed to read upload response: {e}"), Some(Box::new(e)))
        })?;
        Ok(UploadReceipt {
            body: serde_json::from_str(&body).unwrap_or(serde_json::Value::Null),
        })
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut base_url = base_url.trim().to_string();
    if !base_url.ends_with('/') {
        base_url.push('/');
    }
    let url = Url::parse(&base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::url(format!("{base_url} cannot be used as a base URL"), None));
    }
    Ok(url)
}
