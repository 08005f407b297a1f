// Document router: resolves requests beneath a fixed root and reads them

use crate::request::{DocRequest, RequestError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Failures reading a resolved document
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Not a regular file: {}", .path.display())]
    NotAFile { path: PathBuf },

    #[error("File is not valid UTF-8: {} (invalid byte at offset {offset})", .path.display())]
    InvalidUtf8 { path: PathBuf, offset: usize },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DocError {
    fn from_io(path: &Path, source: std::io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            ErrorKind::NotFound => DocError::NotFound { path },
            ErrorKind::PermissionDenied => DocError::PermissionDenied { path },
            _ => DocError::Io { path, source },
        }
    }
}

/// Text payload returned for every call, success or failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocOutcome {
    pub text: String,
    pub is_error: bool,
}

impl DocOutcome {
    pub const ERROR_PREFIX: &'static str = "Error: ";

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            text: format!("{}{}", Self::ERROR_PREFIX, message),
            is_error: true,
        }
    }
}

/// Maps document requests onto files beneath a document root
#[derive(Debug, Clone)]
pub struct DocumentRouter {
    root: PathBuf,
}

impl DocumentRouter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The single candidate path for a request
    pub fn resolve(&self, request: &DocRequest) -> PathBuf {
        self.root.join(request.relative_path())
    }

    /// Read the resolved document in full as UTF-8
    pub async fn read(&self, request: &DocRequest) -> Result<String, DocError> {
        let path = self.resolve(request);

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| DocError::from_io(&path, e))?;
        if !metadata.is_file() {
            return Err(DocError::NotAFile { path });
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| DocError::from_io(&path, e))?;

        String::from_utf8(bytes).map_err(|e| DocError::InvalidUtf8 {
            offset: e.utf8_error().valid_up_to(),
            path,
        })
    }

    /// Parse, resolve and read in one step, absorbing every failure into text
    pub async fn call(&self, name: &str, arguments: serde_json::Value) -> DocOutcome {
        let request = match DocRequest::parse(name, arguments) {
            Ok(request) => request,
            Err(e) => {
                match &e {
                    RequestError::UnknownOperation(_) => tracing::warn!("Rejected call: {}", e),
                    RequestError::InvalidArguments { .. } => tracing::debug!("Rejected call: {}", e),
                }
                return DocOutcome::error(e);
            }
        };

        tracing::debug!(path = %self.resolve(&request).display(), "Handling {}", request);

        match self.read(&request).await {
            Ok(content) => DocOutcome::success(content),
            Err(e) => {
                tracing::warn!("{} failed: {}", request, e);
                DocOutcome::error(e)
            }
        }
    }
}
