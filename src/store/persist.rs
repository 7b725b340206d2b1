//! Durable load/save of the client store
//!
//! The whole store is serialized as one JSON document. Writes go to a
//! temp file first and are renamed into place, so a crashed writer can
//! never leave a truncated document behind. Flushes are serialized by
//! the store's async mutex; each mutating request awaits its flush
//! before the HTTP response is produced.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{error, info};

use super::ClientStore;
use crate::error::{CarouselError, Result};
use crate::models::StoreDocument;

impl ClientStore {
    /// Load the store from disk at process start.
    ///
    /// An absent file initializes an empty store and writes it
    /// immediately, establishing the file as the durable anchor. A
    /// present-but-unreadable document is a startup failure.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(data) => {
                let doc = StoreDocument::from_json(&data).map_err(|e| {
                    CarouselError::Persistence(format!(
                        "cannot parse {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let store = Self::from_document(doc, path.to_path_buf());
                info!(path = %path.display(), "Configuration loaded from file");
                Ok(store)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No configuration file, creating an empty one");
                let store = Self::new(path.to_path_buf());
                store.flush().await?;
                Ok(store)
            }
            Err(e) => Err(CarouselError::Persistence(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Serialize the whole store and overwrite the on-disk document.
    ///
    /// The in-memory store is the source of truth; a failed flush leaves
    /// it untouched and is surfaced to the caller after being logged.
    pub async fn flush(&self) -> Result<()> {
        let json = self.snapshot().to_json()?;

        let _guard = self.flush_lock.lock().await;
        let path = self.path.as_path();
        let tmp = path.with_extension("json.tmp");

        let result: std::io::Result<()> = async {
            tokio::fs::write(&tmp, json.as_bytes()).await?;
            tokio::fs::rename(&tmp, path).await?;
            Ok(())
        }
        .await;

        result.map_err(|e| {
            error!(path = %path.display(), "Failed to persist store: {}", e);
            CarouselError::Persistence(e.to_string())
        })
    }
}
