use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::PdfDocument;

/// Largest file accepted for upload.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// The kinds of file the backend can use as context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// `application/pdf`
    Pdf,

    /// `text/plain`
    Text,
}

impl FileKind {
    /// Infer the kind from a file name's extension.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileKind::Pdf),
            "txt" | "text" => Some(FileKind::Text),
            _ => None,
        }
    }

    /// The MIME type sent with the upload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Text => "text/plain",
        }
    }
}

/// A local file that passed validation and can be uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    file_name: String,
    kind: FileKind,
    data: Vec<u8>,
}

impl UploadFile {
    /// Validate an in-memory file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFile`] if the file is neither PDF nor plain text,
    /// or larger than [`MAX_UPLOAD_BYTES`].
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let Some(kind) = FileKind::from_file_name(&file_name) else {
            return Err(Error::invalid_file(format!(
                "unsupported file type for '{file_name}'; upload a PDF or text file"
            )));
        };
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(Error::invalid_file(format!(
                "'{file_name}' is {} bytes; files must be under 20 MB",
                data.len()
            )));
        }
        Ok(Self {
            file_name,
            kind,
            data,
        })
    }

    /// Read and validate a file from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::invalid_file(format!("{} has no file name", path.display())))?
            .to_string();
        if FileKind::from_file_name(&file_name).is_none() {
            return Self::new(file_name, Vec::new());
        }
        let metadata = fs::metadata(path)
            .map_err(|err| Error::io(format!("failed to stat {}", path.display()), err))?;
        if metadata.len() > MAX_UPLOAD_BYTES as u64 {
            return Err(Error::invalid_file(format!(
                "'{file_name}' is {} bytes; files must be under 20 MB",
                metadata.len()
            )));
        }
        let data = fs::read(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::new(file_name, data)
    }

    /// The file name, which doubles as the server-side reference.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The kind of file.
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// The raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// A document preview for PDFs.
    pub fn pdf_preview(&self) -> Option<PdfDocument> {
        match self.kind {
            FileKind::Pdf => Some(PdfDocument::new(self.file_name.clone(), self.data.clone())),
            FileKind::Text => None,
        }
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("kind", &self.kind)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// The upload endpoint's answer. Its body is not interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Raw JSON body, or `null` if the body was not JSON.
    pub body: serde_json::Value,
}
