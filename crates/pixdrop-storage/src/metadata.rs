//! Upload metadata document
//!
//! A single JSON object mapping stored filename to the UTC time it was uploaded:
//!
//! ```json
//! {
//!   "0f3c...e1.png": "2024-05-01T12:00:00Z"
//! }
//! ```
//!
//! Every read-modify-write cycle runs under the store's mutex, so uploads and the
//! retention sweep in the same process never lose each other's updates. Writes go to a
//! sibling temp file which is then renamed over the document.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};

/// Filename to upload time, sorted by filename.
pub type UploadIndex = BTreeMap<String, DateTime<Utc>>;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to read metadata document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write metadata document {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata document {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[source] serde_json::Error),
}

pub type MetadataResult<T> = Result<T, MetadataError>;

#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory holding the document. Idempotent.
    pub async fn ensure_parent_dir(&self) -> MetadataResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| MetadataError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Take the store lock for a multi-step read-modify-write.
    pub async fn lock(&self) -> MetadataGuard<'_> {
        MetadataGuard {
            store: self,
            _guard: self.lock.lock().await,
        }
    }

    pub async fn load(&self) -> MetadataResult<UploadIndex> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    pub async fn save(&self, index: &UploadIndex) -> MetadataResult<()> {
        let _guard = self.lock.lock().await;
        self.write(index).await
    }

    /// Add one entry, keeping every other entry intact.
    #[tracing::instrument(skip(self), fields(metadata.path = %self.path.display()))]
    pub async fn record_upload(&self, filename: &str, at: DateTime<Utc>) -> MetadataResult<()> {
        let guard = self.lock().await;
        let mut index = guard.load().await?;
        index.insert(filename.to_string(), at);
        guard.save(&index).await?;

        tracing::debug!(entries = index.len(), "Upload recorded");
        Ok(())
    }

    async fn read(&self) -> MetadataResult<UploadIndex> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(UploadIndex::new()),
            Err(source) => {
                return Err(MetadataError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(UploadIndex::new());
        }

        serde_json::from_slice(&raw).map_err(|source| MetadataError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write(&self, index: &UploadIndex) -> MetadataResult<()> {
        let mut json = serde_json::to_vec_pretty(index).map_err(MetadataError::Serialize)?;
        json.push(b'\n');

        let tmp_path = self.temp_path();
        let write_err = |source| MetadataError::Write {
            path: tmp_path.clone(),
            source,
        };

        let mut file = fs::File::create(&tmp_path).await.map_err(write_err)?;
        file.write_all(&json).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        if let Err(source) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(MetadataError::Write {
                path: self.path.clone(),
                source,
            });
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let suffix: [u8; 6] = rand::random();
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", hex::encode(suffix)));
        self.path.with_file_name(name)
    }
}

/// Exclusive access to the document for a read-modify-write cycle.
pub struct MetadataGuard<'a> {
    store: &'a MetadataStore,
    _guard: MutexGuard<'a, ()>,
}

impl MetadataGuard<'_> {
    pub async fn load(&self) -> MetadataResult<UploadIndex> {
        self.store.read().await
    }

    pub async fn save(&self, index: &UploadIndex) -> MetadataResult<()> {
        self.store.write(index).await
    }
}
