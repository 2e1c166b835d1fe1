//! Error types for parley.
//!
//! Every fallible operation in the crate returns [`Error`]. The session converts
//! send-path failures into inline error turns and everything else into
//! notifications, so the variants carry enough context to produce a readable
//! message on their own.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for parley.
#[derive(Clone, Debug)]
pub enum Error {
    /// A request failed local validation and was never sent.
    InvalidRequest {
        /// What was wrong with the request.
        message: String,
        /// Field that failed validation.
        param: Option<String>,
    },

    /// A model selection was rejected.
    InvalidModel {
        /// Why the model was rejected.
        message: String,
    },

    /// The session already has a request in flight.
    Busy {
        /// The operation that was rejected.
        operation: String,
    },

    /// The server answered with a non-success status.
    Server {
        /// HTTP status code.
        status_code: u16,
        /// Message extracted from the error body, if it could be parsed.
        message: Option<String>,
    },

    /// The server reported success but provided no readable body.
    NoResponseBody {
        /// HTTP status code of the empty response.
        status_code: u16,
    },

    /// Reading the response body failed after the response started.
    StreamRead {
        /// Description of the read failure.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The byte stream ended in the middle of a multi-byte sequence.
    TruncatedEncoding {
        /// Number of bytes that could not be decoded.
        pending: usize,
    },

    /// A transcript operation addressed a turn it may not touch.
    Transcript {
        /// Which operation was refused.
        message: String,
    },

    /// A local file was rejected before upload.
    InvalidFile {
        /// Why the file was rejected.
        message: String,
    },

    /// The backend could not be reached.
    Connection {
        /// Description of the connection failure.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The request, including its streamed body, outlived the client timeout.
    Timeout {
        /// Description of the timed-out request.
        message: String,
        /// Configured timeout in seconds.
        duration: Option<f64>,
    },

    /// reqwest failed for a reason other than connect or timeout.
    HttpClient {
        /// Description of the failure.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// JSON or YAML could not be encoded or decoded.
    Serialization {
        /// Description of the codec failure.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Reading an upload or writing an export failed.
    Io {
        /// What was being read or written.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// The base URL or an endpoint could not be built.
    Url {
        /// Description of the bad URL.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },
}

impl Error {
    /// Creates a new invalid request error.
    pub fn invalid_request(message: impl Into<String>, param: Option<String>) -> Self {
        Error::InvalidRequest {
            message: message.into(),
            param,
        }
    }

    /// Creates a new invalid model error.
    pub fn invalid_model(message: impl Into<String>) -> Self {
        Error::InvalidModel {
            message: message.into(),
        }
    }

    /// Creates a new busy error for the named operation.
    pub fn busy(operation: impl Into<String>) -> Self {
        Error::Busy {
            operation: operation.into(),
        }
    }

    /// Creates a new server error.
    pub fn server(status_code: u16, message: Option<String>) -> Self {
        Error::Server {
            status_code,
            message,
        }
    }

    /// Creates a new missing body error.
    pub fn no_response_body(status_code: u16) -> Self {
        Error::NoResponseBody { status_code }
    }

    /// Creates a new stream read error.
    pub fn stream_read(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::StreamRead {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new truncated encoding error.
    pub fn truncated_encoding(pending: usize) -> Self {
        Error::TruncatedEncoding { pending }
    }

    /// Creates a new transcript error.
    pub fn transcript(message: impl Into<String>) -> Self {
        Error::Transcript {
            message: message.into(),
        }
    }

    /// Creates a new invalid file error.
    pub fn invalid_file(message: impl Into<String>) -> Self {
        Error::InvalidFile {
            message: message.into(),
        }
    }

    /// Creates an unreachable-backend error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a timeout error; `duration` is the configured limit in seconds.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates an error for other reqwest failures.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a JSON or YAML codec error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a file I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Maps a transport-level reqwest failure onto the matching variant.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Option<f64>) -> Self {
        if err.is_timeout() {
            Error::timeout(format!("Request timed out: {err}"), timeout)
        } else if err.is_connect() {
            Error::connection(format!("Connection error: {err}"), Some(Box::new(err)))
        } else {
            Error::http_client(format!("Request failed: {err}"), Some(Box::new(err)))
        }
    }

    /// Returns true if this error is a local validation failure.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Error::InvalidRequest { .. })
    }

    /// Returns true if this error rejected a model selection.
    pub fn is_invalid_model(&self) -> bool {
        matches!(self, Error::InvalidModel { .. })
    }

    /// Returns true if this error is a single-flight rejection.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy { .. })
    }

    /// Returns true if the server answered with an error status.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Server { .. })
    }

    /// Returns true if the server sent no body.
    pub fn is_no_response_body(&self) -> bool {
        matches!(self, Error::NoResponseBody { .. })
    }

    /// Returns true if the failure happened while draining a response.
    pub fn is_stream_read(&self) -> bool {
        matches!(self, Error::StreamRead { .. })
    }

    /// Returns true if the stream ended mid-sequence.
    pub fn is_truncated_encoding(&self) -> bool {
        matches!(self, Error::TruncatedEncoding { .. })
    }

    /// Returns true if a local file was rejected.
    pub fn is_invalid_file(&self) -> bool {
        matches!(self, Error::InvalidFile { .. })
    }

    /// Returns true if the client timeout fired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if the backend could not be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// The HTTP status behind this error, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Server { status_code, .. } => Some(*status_code),
            Error::NoResponseBody { status_code } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRequest { message, param } => {
                if let Some(param) = param {
                    write!(f, "Invalid request: {message} (parameter: {param})")
                } else {
                    write!(f, "Invalid request: {message}")
                }
            }
            Error::InvalidModel { message } => {
                write!(f, "Invalid model: {message}")
            }
            Error::Busy { operation } => {
                write!(f, "Busy: cannot {operation} while a request is in flight")
            }
            Error::Server {
                status_code,
                message,
            } => match message {
                Some(message) => write!(f, "{message}"),
                None => write!(f, "Server error: {status_code}"),
            },
            Error::NoResponseBody { status_code } => {
                write!(f, "Server response has no body (status {status_code})")
            }
            Error::StreamRead { message, .. } => {
                write!(f, "Stream read error: {message}")
            }
            Error::TruncatedEncoding { pending } => {
                write!(
                    f,
                    "Truncated encoding: {pending} trailing byte(s) do not form a complete character"
                )
            }
            Error::Transcript { message } => {
                write!(f, "Transcript error: {message}")
            }
            Error::InvalidFile { message } => {
                write!(f, "Invalid file: {message}")
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::StreamRead { source, .. }
            | Error::Connection { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::serialization(format!("YAML error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for parley operations.
pub type Result<T> = std::result::Result<T, Error>;
