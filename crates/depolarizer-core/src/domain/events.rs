//! Events - 進捗チャネルに流れるイベント
//!
//! ドメイン側は `ProgressEvent`（何が起きたか）だけを扱い、
//! クライアントに送る形は `WireEvent`（`{"event": ..., "data": {...}}`）に変換してから流す。

use serde::{Deserialize, Serialize};
use serde_json::json;

/// パイプラインの各段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// セッション開始直後。ペーシングの基準点より前に送られる
    InitiatingDepolarization,
    ReadingFile,
    /// 1 パス分の Transform
    FlippingBits,
}

impl Stage {
    /// クライアントに送るイベント名
    pub fn wire_name(self) -> &'static str {
        match self {
            Stage::InitiatingDepolarization => "initiating_depolarization",
            Stage::ReadingFile => "reading_file",
            Stage::FlippingBits => "flipping_bits_status",
        }
    }

    fn message(self) -> &'static str {
        match self {
            Stage::InitiatingDepolarization => "Initiating depolarization",
            Stage::ReadingFile => "Reading file",
            Stage::FlippingBits => "Flipping bits",
        }
    }
}

/// One progress notification of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StageStarted(Stage),
    /// `sample_bits` is the 2-base rendering of the first bytes seen after `stage`.
    StageResult { stage: Stage, sample_bits: String },
    Completed,
    Ready { download_url: String },
    Failed { message: String },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Ready { .. } | ProgressEvent::Failed { .. })
    }

    pub fn to_wire(&self) -> WireEvent {
        match self {
            ProgressEvent::StageStarted(stage) => WireEvent {
                event: stage.wire_name().to_string(),
                data: json!({ "message": stage.message() }),
            },
            ProgressEvent::StageResult { sample_bits, .. } => WireEvent {
                event: "first_5_binary".to_string(),
                data: json!({ "data": sample_bits }),
            },
            ProgressEvent::Completed => WireEvent {
                event: "complete_message".to_string(),
                data: json!({ "message": "Depolarization complete" }),
            },
            ProgressEvent::Ready { download_url } => WireEvent {
                event: "file_ready".to_string(),
                data: json!({ "download_url": download_url }),
            },
            ProgressEvent::Failed { message } => WireEvent {
                event: "processing_error".to_string(),
                data: json!({ "error": message }),
            },
        }
    }
}

/// 送受信されるフレームの形
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_events_share_one_wire_name() {
        let original = ProgressEvent::StageResult {
            stage: Stage::ReadingFile,
            sample_bits: "0101".into(),
        };
        let flipped = ProgressEvent::StageResult {
            stage: Stage::FlippingBits,
            sample_bits: "1010".into(),
        };
        assert_eq!(original.to_wire().event, "first_5_binary");
        assert_eq!(flipped.to_wire().event, "first_5_binary");
        assert_eq!(flipped.to_wire().data["data"], "1010");
    }

    #[test]
    fn wire_event_shape() {
        let wire = ProgressEvent::Ready {
            download_url: "http://h/download/a_depolarized.bin".into(),
        }
        .to_wire();
        let v = serde_json::to_value(&wire).unwrap();
        assert_eq!(v["event"], "file_ready");
        assert_eq!(v["data"]["download_url"], "http://h/download/a_depolarized.bin");

        let err = ProgressEvent::Failed {
            message: "File not found on server".into(),
        }
        .to_wire();
        assert_eq!(err.event, "processing_error");
        assert_eq!(err.data["error"], "File not found on server");
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::InitiatingDepolarization.wire_name(), "initiating_depolarization");
        assert_eq!(Stage::ReadingFile.wire_name(), "reading_file");
        assert_eq!(Stage::FlippingBits.wire_name(), "flipping_bits_status");
    }

    #[test]
    fn only_ready_and_failed_are_terminal() {
        assert!(!ProgressEvent::Completed.is_terminal());
        assert!(ProgressEvent::Failed { message: String::new() }.is_terminal());
    }
}
