//! InMemoryBlobStore - 開発・テスト用の BlobStore
//!
//! # 実装詳細
//! - HashMap<String, Entry> を Mutex で保護
//! - ロック中に await しない（すべての操作は同期的に完結する）
//! - ディスク I/O がないので、時間を pause したテストでも順序が決定的になる

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::domain::BlobInfo;
use crate::ports::{BlobStore, Clock, StoreError, SystemClock};

struct Entry {
    bytes: Bytes,
    created_at: DateTime<Utc>,
}

pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// 保存されている Blob 名（ソート済み）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // 保持しているのは単純な map だけなので、poison されても中身は使える
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let entry = Entry {
            bytes: Bytes::copy_from_slice(bytes),
            created_at: self.clock.now(),
        };
        self.lock().insert(name.to_string(), entry);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Bytes, StoreError> {
        self.lock()
            .get(name)
            .map(|e| e.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn exists(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.lock().remove(name);
        Ok(())
    }

    async fn stat(&self, name: &str) -> Result<BlobInfo, StoreError> {
        self.lock()
            .get(name)
            .map(|e| BlobInfo {
                name: name.to_string(),
                len: e.bytes.len() as u64,
                created_at: e.created_at,
            })
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}
