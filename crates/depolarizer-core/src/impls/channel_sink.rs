//! ChannelSink / RecordingSink - ProgressSink の実装
//!
//! - **ChannelSink**: unbounded mpsc に積む。受信側（WebSocket の送信ループ）が 1 本だけ読む
//! - **RecordingSink**: 送られたイベントを時刻付きで保持する（開発・テスト用）

use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::domain::ProgressEvent;
use crate::ports::{ChannelClosed, ProgressSink};

#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// sink と、それを読む唯一の receiver を作る
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn send(&self, event: ProgressEvent) -> Result<(), ChannelClosed> {
        self.tx.send(event).map_err(|_| ChannelClosed)
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(Instant, ProgressEvent)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.timeline().into_iter().map(|(_, e)| e).collect()
    }

    /// (送信時刻, イベント) の列
    pub fn timeline(&self) -> Vec<(Instant, ProgressEvent)> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ProgressSink for RecordingSink {
    fn send(&self, event: ProgressEvent) -> Result<(), ChannelClosed> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((Instant::now(), event));
        Ok(())
    }
}
