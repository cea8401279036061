//! UploadService - アップロードされた Blob の保存
//!
//! # フロー
//! 1. フィールドの有無・ファイル名を検証（400）
//! 2. サイズ上限を検証（413）
//! 3. クライアント指定の名前のまま BlobStore に保存
//! 4. 保存した内容を読み戻して先頭バイトの hex を応答に載せる
//!
//! 3, 4 のどこかで失敗したら、書きかけの Blob を削除してからエラーを返す。

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::{DepolError, SAMPLE_LEN, leading_hex};
use crate::ports::{BlobStore, Transform};

pub const NO_FILE_PART: &str = "No file part";
pub const NO_SELECTED_FILE: &str = "No selected file";
pub const UPLOAD_OK: &str = "File successfully uploaded";

/// multipart の `file` フィールドから取り出したもの
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub message: String,
    pub filename: String,
    /// 先頭 5 バイトの hex
    pub data_head: String,
    /// 先頭 5 バイトに Transform を 1 回かけたものの hex
    pub data_head_flipped: String,
}

#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn BlobStore>,
    transform: Arc<dyn Transform>,
    max_upload_bytes: u64,
}

impl UploadService {
    pub fn new(store: Arc<dyn BlobStore>, transform: Arc<dyn Transform>, max_upload_bytes: u64) -> Self {
        Self {
            store,
            transform,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// リクエストが申告した長さ（Content-Length）を本文を読む前に検証する
    pub fn check_declared_len(&self, len: u64) -> Result<(), DepolError> {
        if len > self.max_upload_bytes {
            return Err(DepolError::payload_too_large(self.max_upload_bytes));
        }
        Ok(())
    }

    /// `part` が None なら `file` フィールドがなかったことを表す
    pub async fn accept(&self, part: Option<UploadPart>) -> Result<UploadReceipt, DepolError> {
        let part = part.ok_or_else(|| DepolError::Validation(NO_FILE_PART.to_string()))?;
        if part.filename.is_empty() {
            return Err(DepolError::Validation(NO_SELECTED_FILE.to_string()));
        }
        self.check_declared_len(part.bytes.len() as u64)?;

        let name = part.filename;
        match self.save(&name, &part.bytes).await {
            Ok(stored) => {
                let head = &stored[..stored.len().min(SAMPLE_LEN)];
                tracing::info!(blob = %name, len = stored.len(), "upload stored");
                Ok(UploadReceipt {
                    message: UPLOAD_OK.to_string(),
                    data_head: leading_hex(head),
                    data_head_flipped: leading_hex(&self.transform.apply(head)),
                    filename: name,
                })
            }
            Err(e) => {
                tracing::warn!(blob = %name, error = %e, "upload failed, removing partial blob");
                if let Err(cleanup) = self.store.delete(&name).await {
                    tracing::warn!(blob = %name, error = %cleanup, "partial blob cleanup failed");
                }
                Err(e)
            }
        }
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> Result<Bytes, DepolError> {
        self.store.put(name, bytes).await?;
        Ok(self.store.get(name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::impls::{ComplementTransform, InMemoryBlobStore};
    use crate::ports::StoreError;
    use async_trait::async_trait;

    fn service(store: Arc<dyn BlobStore>, max: u64) -> UploadService {
        UploadService::new(store, Arc::new(ComplementTransform), max)
    }

    fn part(name: &str, bytes: impl Into<Bytes>) -> Option<UploadPart> {
        Some(UploadPart {
            filename: name.to_string(),
            bytes: bytes.into(),
        })
    }

    #[tokio::test]
    async fn missing_field_is_rejected() {
        let svc = service(Arc::new(InMemoryBlobStore::new()), 1024);
        let err = svc.accept(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "No file part");
    }

    #[tokio::test]
    async fn empty_filename_is_rejected() {
        let store = Arc::new(InMemoryBlobStore::new());
        let svc = service(store.clone(), 1024);
        let err = svc.accept(part("", &b"abc"[..])).await.unwrap_err();
        assert_eq!(err.to_string(), "No selected file");
        assert!(store.names().is_empty());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_before_saving() {
        let store = Arc::new(InMemoryBlobStore::new());
        let svc = service(store.clone(), 2 * 1024 * 1024);
        let big = vec![0u8; 2 * 1024 * 1024 + 1];

        let err = svc.accept(part("big.bin", big)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
        assert_eq!(err.to_string(), "File too large (max size 2 MB)");
        assert!(store.names().is_empty());
    }

    #[tokio::test]
    async fn stores_under_client_name_and_reports_head() {
        let store = Arc::new(InMemoryBlobStore::new());
        let svc = service(store.clone(), 1024);

        let receipt = svc.accept(part("clip.bin", &b"\x00\xFF\x01\xFE\x10\x20"[..])).await.unwrap();
        assert_eq!(receipt.message, "File successfully uploaded");
        assert_eq!(receipt.filename, "clip.bin");
        assert_eq!(receipt.data_head, "00ff01fe10");
        assert_eq!(receipt.data_head_flipped, "ff00fe01ef");
        assert_eq!(&store.get("clip.bin").await.unwrap()[..], b"\x00\xFF\x01\xFE\x10\x20");
    }

    /// put は成功したように見えて、読み戻しで失敗するストア
    struct UnreadableStore {
        inner: InMemoryBlobStore,
    }

    #[async_trait]
    impl BlobStore for UnreadableStore {
        async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
            self.inner.put(name, bytes).await
        }
        async fn get(&self, name: &str) -> Result<Bytes, StoreError> {
            Err(StoreError::Io {
                name: name.to_string(),
                source: std::io::Error::other("disk on fire"),
            })
        }
        async fn exists(&self, name: &str) -> bool {
            self.inner.exists(name).await
        }
        async fn delete(&self, name: &str) -> Result<(), StoreError> {
            self.inner.delete(name).await
        }
        async fn stat(&self, name: &str) -> Result<crate::domain::BlobInfo, StoreError> {
            self.inner.stat(name).await
        }
    }

    #[tokio::test]
    async fn storage_failure_rolls_back_partial_blob() {
        let store = Arc::new(UnreadableStore {
            inner: InMemoryBlobStore::new(),
        });
        let svc = service(store.clone(), 1024);

        let err = svc.accept(part("half.bin", &b"abc"[..])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("disk on fire"));
        assert!(!store.exists("half.bin").await);
    }
}
