//! ProgressSink port - クライアントごとの進捗チャネル
//!
//! # 設計原則
//! - fire-and-forget: ack もバックプレッシャーもない
//! - `send` は即座にキューに積むだけ。時間制御（ペーシング）は呼び出し側の責務
//! - 1 セッション内の順序は保たれる

use crate::domain::ProgressEvent;

#[derive(Debug, thiserror::Error)]
#[error("progress channel closed")]
pub struct ChannelClosed;

pub trait ProgressSink: Send + Sync {
    fn send(&self, event: ProgressEvent) -> Result<(), ChannelClosed>;
}
