//! Pacer - 進捗イベントのペーシング
//!
//! 直前の送信から `min_interval` 経つまで現在のタスクだけを待たせてから送る。
//! `tokio::time::sleep_until` による協調的な待機なので、他のセッションやサーバーの
//! accept は止まらない。

use std::time::Duration;

use tokio::time::Instant;

use crate::domain::ProgressEvent;
use crate::ports::ProgressSink;

/// `last_emit + min_interval` まで待ってから `event` を送り、新しい基準時刻を返す。
///
/// チャネルが閉じていても（クライアント切断）パイプラインは止めない。
pub async fn emit_paced(
    sink: &dyn ProgressSink,
    event: ProgressEvent,
    min_interval: Duration,
    last_emit: Instant,
) -> Instant {
    tokio::time::sleep_until(last_emit + min_interval).await;
    if let Err(e) = sink.send(event) {
        tracing::debug!(error = %e, "progress event dropped");
    }
    Instant::now()
}

/// 1 セッション分の基準時刻を持ち回る `emit_paced` のラッパー
pub struct Pacer<'a> {
    sink: &'a dyn ProgressSink,
    min_interval: Duration,
    last_emit: Instant,
}

impl<'a> Pacer<'a> {
    /// 基準時刻を「いま」にして開始する
    pub fn start(sink: &'a dyn ProgressSink, min_interval: Duration) -> Self {
        Self {
            sink,
            min_interval,
            last_emit: Instant::now(),
        }
    }

    pub async fn emit(&mut self, event: ProgressEvent) {
        self.last_emit = emit_paced(self.sink, event, self.min_interval, self.last_emit).await;
    }

    pub fn last_emit(&self) -> Instant {
        self.last_emit
    }
}
