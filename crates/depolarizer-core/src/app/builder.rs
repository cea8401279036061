//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! 設定の検証は `build()` でまとめて行い、起動後に壊れた設定で走り出すことはない。

use std::sync::Arc;

use super::config::AppConfig;
use super::download::DownloadService;
use super::expiry::ExpiryScheduler;
use super::pipeline::{PipelineSettings, UploadPipeline};
use super::upload::UploadService;
use crate::impls::{ComplementTransform, FsBlobStore};
use crate::ports::{BlobStore, Clock, IdGenerator, StoreError, SystemClock, Transform, UlidGenerator};

/// AppBuilder は App を構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(AppConfig::default())
///     .with_store(Arc::new(InMemoryBlobStore::new()))
///     .build()
///     .await?;
/// ```
///
/// store を渡さなければ `config.upload_dir` に `FsBlobStore` を開く。
pub struct AppBuilder {
    config: AppConfig,
    store: Option<Arc<dyn BlobStore>>,
    transform: Arc<dyn Transform>,
    clock: Arc<dyn Clock>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("transform_passes must be at least 1")]
    NoTransformPasses,

    #[error("derived_suffix must not be empty")]
    EmptyDerivedSuffix,

    #[error("max_upload_bytes must be greater than zero")]
    ZeroUploadLimit,

    #[error("failed to open blob store: {0}")]
    Store(#[from] StoreError),
}

impl AppBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: None,
            transform: Arc::new(ComplementTransform),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn build(self) -> Result<App, BuildError> {
        let config = self.config;
        if config.transform_passes == 0 {
            return Err(BuildError::NoTransformPasses);
        }
        if config.derived_suffix.is_empty() {
            return Err(BuildError::EmptyDerivedSuffix);
        }
        if config.max_upload_bytes == 0 {
            return Err(BuildError::ZeroUploadLimit);
        }

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(FsBlobStore::open(&config.upload_dir).await?),
        };
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(self.clock.clone()));
        let expiry = ExpiryScheduler::new(store.clone(), ids.clone(), self.clock.clone());

        let upload = UploadService::new(store.clone(), self.transform.clone(), config.max_upload_bytes);
        let pipeline = UploadPipeline::new(
            store.clone(),
            self.transform.clone(),
            expiry.clone(),
            ids,
            self.clock,
            PipelineSettings {
                pacing_interval: config.pacing_interval,
                expiry_delay: config.expiry_delay,
                transform_passes: config.transform_passes,
                derived_suffix: config.derived_suffix.clone(),
            },
        );
        let download = DownloadService::new(store.clone());

        tracing::info!(
            transform = self.transform.name(),
            passes = config.transform_passes,
            pacing_ms = config.pacing_interval.as_millis() as u64,
            expiry_secs = config.expiry_delay.as_secs(),
            max_upload_bytes = config.max_upload_bytes,
            "app built"
        );

        Ok(App {
            config,
            store,
            upload,
            pipeline,
            download,
            expiry,
        })
    }
}

/// App はアプリケーションのランタイム。Clone はすべて同じ状態を共有する。
#[derive(Clone)]
pub struct App {
    pub config: AppConfig,
    pub store: Arc<dyn BlobStore>,
    pub upload: UploadService,
    pub pipeline: UploadPipeline,
    pub download: DownloadService,
    pub expiry: ExpiryScheduler,
}

impl App {
    /// 待機中の遅延削除を破棄して終了を待つ
    pub async fn shutdown(&self) {
        let pending = self.expiry.pending();
        self.expiry.shutdown_and_join().await;
        tracing::info!(abandoned = pending, "app shut down");
    }
}
