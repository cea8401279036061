//! FsBlobStore - ディレクトリ直下にファイルとして保存する BlobStore
//!
//! Blob 名はそのまま `root.join(name)` に使う（sanitize しない）。
//! `../` や絶対パスを含む名前はルート外を指すので、書き込み時に警告ログを残す。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::domain::{BlobInfo, escapes_root};
use crate::ports::{BlobStore, StoreError};

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// `root` を作成して（なければ）開く
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| StoreError::Io {
                name: root.display().to_string(),
                source,
            })?;
        tracing::info!(root = %root.display(), "blob store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if escapes_root(name) {
            tracing::warn!(blob = name, "blob name points outside the upload directory");
        }
        tokio::fs::write(self.path_of(name), bytes)
            .await
            .map_err(|source| StoreError::Io {
                name: name.to_string(),
                source,
            })?;
        tracing::debug!(blob = name, len = bytes.len(), "blob written");
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Bytes, StoreError> {
        let data = tokio::fs::read(self.path_of(name))
            .await
            .map_err(|e| StoreError::from_io(name, e))?;
        Ok(Bytes::from(data))
    }

    async fn exists(&self, name: &str) -> bool {
        tokio::fs::metadata(self.path_of(name))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_of(name)).await {
            Ok(()) => {
                tracing::debug!(blob = name, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }

    async fn stat(&self, name: &str) -> Result<BlobInfo, StoreError> {
        let meta = tokio::fs::metadata(self.path_of(name))
            .await
            .map_err(|e| StoreError::from_io(name, e))?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        // birth time が取れないファイルシステムでは mtime で代用
        let created_at = meta
            .created()
            .or_else(|_| meta.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(BlobInfo {
            name: name.to_string(),
            len: meta.len(),
            created_at,
        })
    }
}
