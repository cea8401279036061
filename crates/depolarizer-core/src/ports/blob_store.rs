//! BlobStore port - 名前をキーにした Blob ストレージ
//!
//! # 設計原則
//! - ロックは持たない。同じ名前への並行 put/delete はファイルシステム上で競合する
//!   （名前はクライアント指定なので衝突は既知の未対処ケース）
//! - `delete` は存在しなくてもエラーにしない
//! - Blob の削除権限はパイプライン（元 Blob）と ExpiryScheduler（派生 Blob）だけが持つ

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::BlobInfo;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("storage error on {name:?}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// `io::ErrorKind::NotFound` を `StoreError::NotFound` に寄せる
    pub fn from_io(name: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(name.to_string())
        } else {
            StoreError::Io {
                name: name.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 書き込み（既存なら上書き）
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// 読み出し。存在しなければ `StoreError::NotFound`
    async fn get(&self, name: &str) -> Result<Bytes, StoreError>;

    async fn exists(&self, name: &str) -> bool;

    /// 削除。存在しなければ no-op
    async fn delete(&self, name: &str) -> Result<(), StoreError>;

    /// サイズと作成時刻
    async fn stat(&self, name: &str) -> Result<BlobInfo, StoreError>;
}
