//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: Clock の時刻 + 乱数から ULID を作る

use std::sync::Arc;

use crate::domain::{ExpiryId, SessionId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はセッションと遅延削除タスクの ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数のセッションタスクから使われる）
pub trait IdGenerator: Send + Sync {
    fn generate_session_id(&self) -> SessionId;

    fn generate_expiry_id(&self) -> ExpiryId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// FixedClock を渡せば timestamp 部分が決定的になります。
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl IdGenerator for UlidGenerator {
    fn generate_session_id(&self) -> SessionId {
        SessionId::from(self.next_ulid())
    }

    fn generate_expiry_id(&self) -> ExpiryId {
        ExpiryId::from(self.next_ulid())
    }
}
