//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 設定の検証とワイヤリング
//! - **UploadService**: アップロードの検証と保存
//! - **UploadPipeline**: 読み出し → Transform → 書き込み → 通知のセッション
//! - **Pacer**: 進捗イベントの最小間隔
//! - **ExpiryScheduler**: 派生 Blob の遅延削除
//! - **DownloadService**: 保存済み Blob の配信

pub mod builder;
pub mod config;
pub mod download;
pub mod expiry;
pub mod pacer;
pub mod pipeline;
pub mod upload;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::config::AppConfig;
pub use self::download::{Download, DownloadService, EXPIRED_MESSAGE};
pub use self::expiry::{ExpiryScheduler, ExpiryTask};
pub use self::pacer::{Pacer, emit_paced};
pub use self::pipeline::{
    FILE_NOT_FOUND_MESSAGE, PipelineSettings, ProcessRequest, SessionReport, UploadPipeline,
    download_url,
};
pub use self::upload::{NO_FILE_PART, NO_SELECTED_FILE, UPLOAD_OK, UploadPart, UploadReceipt, UploadService};
