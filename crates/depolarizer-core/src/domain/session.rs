//! Session - 1 回の "start processing" に対応する処理単位
//!
//! # 状態遷移
//! ```text
//! Idle -> Reading -> Transforming(1) -> .. -> Transforming(n) -> Writing -> Scheduling -> Completing -> Done
//!   \________\______________\__________________\__________\___________\____________> Failed
//! ```
//! - Failed はどの非終端状態からでも到達できる
//! - 永続化しない。セッションはパイプラインが走っている間だけ存在する

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "pass", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Reading,
    /// 1 始まりのパス番号
    Transforming(u32),
    Writing,
    Scheduling,
    Completing,
    Done,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }

    /// `self -> next` が許される遷移かどうか
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (s, Failed) => !s.is_terminal(),
            (Idle, Reading) => true,
            (Reading, Transforming(1)) => true,
            (Transforming(a), Transforming(b)) => b == a + 1,
            (Transforming(_), Writing) => true,
            (Writing, Scheduling) => true,
            (Scheduling, Completing) => true,
            (Completing, Done) => true,
            _ => false,
        }
    }
}

/// Ephemeral record of one pipeline run.
#[derive(Debug, Clone)]
pub struct ProcessingSession {
    pub id: SessionId,
    pub source_name: String,
    /// `file_ready` の URL を組み立てる基準（`http://host` など）
    pub download_base: String,
    pub started_at: DateTime<Utc>,
    state: SessionState,
}

impl ProcessingSession {
    pub fn new(
        id: SessionId,
        source_name: impl Into<String>,
        download_base: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            source_name: source_name.into(),
            download_base: download_base.into(),
            started_at,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 状態を進める。許されない遷移なら何もせず false を返す。
    pub fn enter(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                session = %self.id,
                from = ?self.state,
                to = ?next,
                "rejected session state transition"
            );
            return false;
        }
        tracing::debug!(session = %self.id, from = ?self.state, to = ?next, "session state");
        self.state = next;
        true
    }
}
