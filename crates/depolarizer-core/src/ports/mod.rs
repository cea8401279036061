//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部の仕組み（ファイルシステム, WebSocket, 時計）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - 共有される可変状態は BlobStore（ファイルシステム）だけ
//! - 進捗チャネルはセッションごと（共有しない）

pub mod blob_store;
pub mod transform;
pub mod progress_sink;
pub mod clock;
pub mod id_generator;

// 主要な trait を再エクスポート
pub use self::blob_store::{BlobStore, StoreError};
pub use self::transform::Transform;
pub use self::progress_sink::{ChannelClosed, ProgressSink};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
