//! DownloadService - 保存済み Blob をそのまま返す
//!
//! 存在しない（未アップロード, 期限切れ, 削除済み）場合は期限切れの可能性を示すメッセージで NotFound。

use std::sync::Arc;

use bytes::Bytes;

use crate::domain::{BlobInfo, DepolError};
use crate::ports::{BlobStore, StoreError};

pub const EXPIRED_MESSAGE: &str = "File not found or has expired";

#[derive(Debug, Clone)]
pub struct Download {
    pub info: BlobInfo,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct DownloadService {
    store: Arc<dyn BlobStore>,
}

impl DownloadService {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, name: &str) -> Result<Download, DepolError> {
        if !self.store.exists(name).await {
            return Err(DepolError::NotFound(EXPIRED_MESSAGE.to_string()));
        }
        // exists と読み出しの間に期限切れで消えることがある
        let info = self.store.stat(name).await.map_err(expired)?;
        let bytes = self.store.get(name).await.map_err(expired)?;
        let content_type = mime_guess::from_path(name).first_or_octet_stream().to_string();

        tracing::info!(blob = name, len = info.len, created_at = %info.created_at, "download served");
        Ok(Download {
            info,
            content_type,
            bytes,
        })
    }
}

fn expired(e: StoreError) -> DepolError {
    match e {
        StoreError::NotFound(_) => DepolError::NotFound(EXPIRED_MESSAGE.to_string()),
        other => other.into(),
    }
}
