use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Store, StoreError};
use crate::models::QueueItem;

const DOCUMENT_VERSION: u32 = 1;

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    items: &'a [QueueItem],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Versioned {
        #[allow(dead_code)]
        version: u32,
        items: Vec<QueueItem>,
    },
    Bare(Vec<QueueItem>),
}

/// Queue collection persisted as one JSON document on disk.
pub struct JsonFileStore {
    path: PathBuf,
    /// Set when the document could neither be read nor moved aside. Saves are
    /// refused until a later load succeeds.
    unreadable: AtomicBool,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            unreadable: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Move an unreadable document aside so the next save can't clobber it.
    /// If that fails, saves are blocked instead.
    async fn quarantine(&self) {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{}", chrono::Utc::now().timestamp_millis()));
        let target = PathBuf::from(name);
        match tokio::fs::rename(&self.path, &target).await {
            Ok(()) => tracing::warn!("Moved unreadable queue document to {}", target.display()),
            Err(e) => {
                tracing::error!(
                    "Failed to move unreadable queue document aside, refusing to overwrite {}: {e}",
                    self.path.display()
                );
                self.unreadable.store(true, Ordering::SeqCst);
            }
        }
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn load(&self) -> Result<Vec<QueueItem>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                self.quarantine().await;
                return Err(StoreError::Read(format!("{}: {e}", self.path.display())));
            }
        };

        match serde_json::from_slice::<Document>(&bytes) {
            Ok(Document::Versioned { items, .. }) | Ok(Document::Bare(items)) => {
                self.unreadable.store(false, Ordering::SeqCst);
                Ok(items)
            }
            Err(e) => {
                self.quarantine().await;
                Err(StoreError::Read(format!("{}: {e}", self.path.display())))
            }
        }
    }

    async fn save(&self, items: &[QueueItem]) -> Result<(), StoreError> {
        if self.unreadable.load(Ordering::SeqCst) {
            return Err(StoreError::Write(format!(
                "{}: document could not be read, not overwriting it",
                self.path.display()
            )));
        }

        let body = serde_json::to_vec_pretty(&DocumentRef {
            version: DOCUMENT_VERSION,
            items,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Write(format!("{}: {e}", parent.display())))?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| StoreError::Write(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Write(format!("{}: {e}", self.path.display())))?;

        Ok(())
    }
}
