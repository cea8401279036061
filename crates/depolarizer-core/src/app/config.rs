//! AppConfig - コンポーネントに渡す設定
//!
//! グローバルな設定は持たない。`AppBuilder` がこの構造体から各コンポーネントを組み立てる。

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::DEFAULT_DERIVED_SUFFIX;

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 300 * 1024 * 1024;
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_millis(1800);
pub const DEFAULT_EXPIRY_DELAY: Duration = Duration::from_secs(60);
pub const DEFAULT_TRANSFORM_PASSES: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Blob を保存するディレクトリ
    pub upload_dir: PathBuf,
    /// リクエストボディの上限（multipart 全体）
    pub max_upload_bytes: u64,
    /// 連続する進捗イベントの最小間隔
    pub pacing_interval: Duration,
    /// 派生 Blob を書いてから削除するまでの時間
    pub expiry_delay: Duration,
    /// Transform を何回適用するか。サンプルイベントは passes + 1 回送られる
    pub transform_passes: u32,
    pub derived_suffix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            pacing_interval: DEFAULT_PACING_INTERVAL,
            expiry_delay: DEFAULT_EXPIRY_DELAY,
            transform_passes: DEFAULT_TRANSFORM_PASSES,
            derived_suffix: DEFAULT_DERIVED_SUFFIX.to_string(),
        }
    }
}

impl AppConfig {
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval = interval;
        self
    }

    pub fn with_expiry_delay(mut self, delay: Duration) -> Self {
        self.expiry_delay = delay;
        self
    }

    pub fn with_max_upload_bytes(mut self, max: u64) -> Self {
        self.max_upload_bytes = max;
        self
    }
}
