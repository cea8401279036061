//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **FsBlobStore**: ディレクトリに保存する本番用の BlobStore
//! - **InMemoryBlobStore**: 開発・テスト用の BlobStore
//! - **ComplementTransform**: ビット反転（デフォルトの Transform）
//! - **ChannelSink**: mpsc ベースの進捗チャネル
//! - **RecordingSink**: 送信イベントを記録する（テスト用）

pub mod fs_blob_store;
pub mod inmem_blob_store;
pub mod complement;
pub mod channel_sink;

// 主要な型を再エクスポート
pub use self::fs_blob_store::FsBlobStore;
pub use self::inmem_blob_store::InMemoryBlobStore;
pub use self::complement::ComplementTransform;
pub use self::channel_sink::{ChannelSink, RecordingSink};
