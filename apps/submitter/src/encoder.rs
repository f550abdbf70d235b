use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::picker::ContentRef;

/// The selected file could not be read at submit time (moved, deleted, permission revoked).
#[derive(Debug, Error)]
#[error("could not read {path:?}: {source}")]
pub struct ReadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[async_trait]
pub trait FileEncoder: Send + Sync {
    /// Reads the whole file and returns it as padded standard base64. No size cap.
    async fn encode(&self, location: &ContentRef) -> Result<String, ReadError>;
}

/// Reads from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsEncoder;

#[async_trait]
impl FileEncoder for FsEncoder {
    async fn encode(&self, location: &ContentRef) -> Result<String, ReadError> {
        let bytes = tokio::fs::read(location.path())
            .await
            .map_err(|source| ReadError {
                path: location.path().to_path_buf(),
                source,
            })?;
        debug!("Encoding {} bytes from {:?}", bytes.len(), location.path());
        Ok(BASE64_STANDARD.encode(bytes))
    }
}
