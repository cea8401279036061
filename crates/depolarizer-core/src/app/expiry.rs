//! ExpiryScheduler - 派生 Blob の遅延削除
//!
//! # 設計原則
//! - `schedule_delete` ごとに独立したバックグラウンドタスクを 1 本起動する
//! - タスクを作ったセッションより長生きする。キャンセル手段は提供しない
//! - 削除の失敗（すでに消えている等）はログに残すだけで伝播しない
//! - 永続化しない。プロセスが先に終われば削除は失われ、Blob は残る
//!
//! # Shutdown
//! `shutdown_and_join()` は待機中のタスクを起こし、削除せずに終了させてから全タスクの終了を待つ。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::task::TaskTracker;

use crate::domain::ExpiryId;
use crate::ports::{BlobStore, Clock, IdGenerator};

/// A scheduled deferred deletion. Fires exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryTask {
    pub id: ExpiryId,
    pub blob_name: String,
    pub fire_at: DateTime<Utc>,
}

/// ExpiryScheduler handle. Clones share the same task set.
#[derive(Clone)]
pub struct ExpiryScheduler {
    store: Arc<dyn BlobStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    tracker: TaskTracker,
}

impl ExpiryScheduler {
    pub fn new(store: Arc<dyn BlobStore>, ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            store,
            ids,
            clock,
            shutdown_tx: Arc::new(shutdown_tx),
            tracker: TaskTracker::new(),
        }
    }

    /// `delay` 後に `blob_name` を削除するタスクを起動する。
    pub fn schedule_delete(&self, blob_name: &str, delay: Duration) -> ExpiryTask {
        let fire_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| self.clock.now().checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let task = ExpiryTask {
            id: self.ids.generate_expiry_id(),
            blob_name: blob_name.to_string(),
            fire_at,
        };

        let store = Arc::clone(&self.store);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let id = task.id;
        let name = task.blob_name.clone();

        tracing::debug!(expiry = %id, blob = %name, delay_ms = delay.as_millis() as u64, "expiry scheduled");

        self.tracker.spawn(async move {
            let shutdown = async {
                // Sender がいなくなった場合は shutdown 扱いにせず、普通に満了を待つ
                if shutdown_rx.wait_for(|stop| *stop).await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown => {
                    tracing::info!(expiry = %id, blob = %name, "expiry abandoned at shutdown");
                    return;
                }
            }

            match store.delete(&name).await {
                Ok(()) => tracing::info!(expiry = %id, blob = %name, "expired blob deleted"),
                Err(e) => tracing::warn!(expiry = %id, blob = %name, error = %e, "expiry delete failed"),
            }
        });

        task
    }

    /// まだ終わっていない遅延削除の数
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wake every pending task so it exits without deleting.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all tasks.
    pub async fn shutdown_and_join(&self) {
        self.request_shutdown();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryBlobStore;
    use crate::ports::{FixedClock, SystemClock, UlidGenerator};
    use chrono::TimeZone;

    fn scheduler(store: Arc<InMemoryBlobStore>) -> ExpiryScheduler {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        ExpiryScheduler::new(store, Arc::new(UlidGenerator::new(clock.clone())), clock)
    }

    #[tokio::test(start_paused = true)]
    async fn deletes_after_the_delay() {
        let store = Arc::new(InMemoryBlobStore::new());
        store.put("out.bin", b"x").await.unwrap();
        let expiry = scheduler(store.clone());

        expiry.schedule_delete("out.bin", Duration::from_secs(60));
        assert_eq!(expiry.pending(), 1);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(store.exists("out.bin").await);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!store.exists("out.bin").await);
        assert_eq!(expiry.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn already_gone_blob_is_absorbed() {
        let store = Arc::new(InMemoryBlobStore::new());
        let expiry = scheduler(store.clone());

        expiry.schedule_delete("never-written.bin", Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(expiry.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_run_independently() {
        let store = Arc::new(InMemoryBlobStore::new());
        store.put("a", b"a").await.unwrap();
        store.put("b", b"b").await.unwrap();
        let expiry = scheduler(store.clone());

        expiry.schedule_delete("a", Duration::from_secs(10));
        expiry.schedule_delete("b", Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(store.names(), vec!["b".to_string()]);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(store.names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn outlives_the_scheduler_handle() {
        let store = Arc::new(InMemoryBlobStore::new());
        store.put("detached.bin", b"x").await.unwrap();

        scheduler(store.clone()).schedule_delete("detached.bin", Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!store.exists("detached.bin").await);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_pending_deletions() {
        let store = Arc::new(InMemoryBlobStore::new());
        store.put("kept.bin", b"x").await.unwrap();
        let expiry = scheduler(store.clone());

        expiry.schedule_delete("kept.bin", Duration::from_secs(60));
        expiry.shutdown_and_join().await;

        assert_eq!(expiry.pending(), 0);
        assert!(store.exists("kept.bin").await);
    }

    #[tokio::test(start_paused = true)]
    async fn fire_at_is_now_plus_delay() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now));
        let expiry = ExpiryScheduler::new(
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(UlidGenerator::new(clock.clone())),
            clock,
        );

        let task = expiry.schedule_delete("x", Duration::from_secs(60));
        assert_eq!(task.blob_name, "x");
        assert_eq!(task.fire_at, now + chrono::Duration::seconds(60));
        assert!(task.id.to_string().starts_with("expiry-"));
    }
}
