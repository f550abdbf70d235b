//! File Selector — how a resume file gets chosen.
//!
//! On a phone this is the platform document picker. Here it is [`PathSelector`],
//! which resolves a path given on the command line and applies the same
//! MIME allow-list the picker would.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// The only document types a resume may be.
pub const ALLOWED_MIME_TYPES: &[&str] = &[MIME_PDF, MIME_DOC, MIME_DOCX];

/// Handle the encoder dereferences to get the file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef(PathBuf);

impl ContentRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ContentRef(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Metadata of the picked file, captured at pick time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub location: ContentRef,
}

impl SelectedFile {
    /// Size in kilobytes with two decimals, e.g. `"2.00 KB"`.
    pub fn display_size(&self) -> String {
        format!("{:.2} KB", self.size as f64 / 1024.0)
    }
}

#[derive(Debug, Error)]
pub enum PickError {
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("not a regular file: {0:?}")]
    NotAFile(PathBuf),

    #[error("unsupported document type '{mime_type}' for {path:?}")]
    UnsupportedType { path: PathBuf, mime_type: String },

    #[error("could not access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait FileSelector: Send + Sync {
    /// `Ok(None)` means the user cancelled.
    async fn pick_document(&self, allowed: &[&str]) -> Result<Option<SelectedFile>, PickError>;
}

/// Picks whatever path it was built with. An empty path counts as a cancelled pick.
#[derive(Debug, Clone)]
pub struct PathSelector {
    path: PathBuf,
}

impl PathSelector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FileSelector for PathSelector {
    async fn pick_document(&self, allowed: &[&str]) -> Result<Option<SelectedFile>, PickError> {
        if self.path.as_os_str().is_empty() {
            return Ok(None);
        }

        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PickError::NotFound(self.path.clone()));
            }
            Err(source) => {
                return Err(PickError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if !metadata.is_file() {
            return Err(PickError::NotAFile(self.path.clone()));
        }

        let mime_type = mime_type_for(&self.path);
        if !allowed.contains(&mime_type.as_str()) {
            return Err(PickError::UnsupportedType {
                path: self.path.clone(),
                mime_type,
            });
        }

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!(
            "Selected resume '{}' ({} bytes, {})",
            name,
            metadata.len(),
            mime_type
        );

        Ok(Some(SelectedFile {
            name,
            size: metadata.len(),
            mime_type,
            location: ContentRef::new(&self.path),
        }))
    }
}

/// Extension-based MIME lookup; unknown extensions become `application/octet-stream`.
fn mime_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
