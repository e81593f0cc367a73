use std::path::{Path, PathBuf};

/// Only PDFs may be uploaded.
pub const PDF_MIME: &str = "application/pdf";
/// Upper bound for an uploaded file, inclusive.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UploadError {
    #[error("Please select a PDF file (got {0})")]
    NotPdf(String),
    #[error("File size must be less than 50MB ({0} bytes)")]
    TooLarge(u64),
    #[error("Failed to read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Where the upload bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadBody {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// A file picked for upload, described the way a browser file input would.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    file_name: String,
    mime_type: String,
    size: u64,
    body: UploadBody,
}

impl UploadFile {
    pub fn from_bytes(file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            body: UploadBody::Bytes(bytes),
        }
    }

    /// Describes a file on disk. The MIME type is inferred from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, UploadError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| UploadError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload.pdf")
            .to_string();
        Ok(Self {
            mime_type: mime_for(path).to_string(),
            file_name,
            size: metadata.len(),
            body: UploadBody::Path(path.to_path_buf()),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn body(&self) -> &UploadBody {
        &self.body
    }

    /// Checks the PDF-only and 50 MiB rules. Nothing is sent when this fails.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.mime_type != PDF_MIME {
            return Err(UploadError::NotPdf(self.mime_type.clone()));
        }
        if self.size > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge(self.size));
        }
        Ok(())
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("pdf") => PDF_MIME,
        _ => "application/octet-stream",
    }
}

/// Multipart payload of `POST /content/upload`.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub file: UploadFile,
    pub title: String,
    pub description: String,
}

impl UploadRequest {
    /// The title defaults to the file name.
    pub fn new(file: UploadFile) -> Self {
        Self {
            title: file.file_name().to_string(),
            description: String::new(),
            file,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}
