//! Errors - エラー型と分類
//!
//! `ErrorKind` は呼び出し側（HTTP 層, 進捗チャネル）がどう扱うかの分類です。

use thiserror::Error;

use crate::ports::StoreError;

/// 呼び出し側から見たエラーの分類
///
/// - Validation: ユーザーが直せる入力不備（400）
/// - PayloadTooLarge: サイズ上限超過（413）
/// - Storage: 保存・読み出し時の I/O 失敗（500 / processing_error）
/// - NotFound: 存在しない・期限切れ（404 / processing_error）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    PayloadTooLarge,
    Storage,
    NotFound,
}

#[derive(Debug, Error)]
pub enum DepolError {
    #[error("{0}")]
    Validation(String),

    #[error("File too large (max size {max_mb} MB)")]
    PayloadTooLarge { max_mb: u64 },

    #[error(transparent)]
    Storage(StoreError),

    #[error("{0}")]
    NotFound(String),

    #[error("transform stage {stage:?} aborted")]
    TransformAborted { stage: String },

    #[error("invalid download base {base:?}: {source}")]
    InvalidDownloadBase {
        base: String,
        #[source]
        source: url::ParseError,
    },
}

impl DepolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DepolError::Validation(_) => ErrorKind::Validation,
            DepolError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            DepolError::Storage(StoreError::NotFound(_)) | DepolError::NotFound(_) => {
                ErrorKind::NotFound
            }
            // 内部要因の失敗はすべて Storage 扱い（500 / processing_error）
            DepolError::Storage(_)
            | DepolError::TransformAborted { .. }
            | DepolError::InvalidDownloadBase { .. } => ErrorKind::Storage,
        }
    }

    pub fn payload_too_large(max_bytes: u64) -> Self {
        DepolError::PayloadTooLarge {
            max_mb: max_bytes / (1024 * 1024),
        }
    }
}

impl From<StoreError> for DepolError {
    fn from(e: StoreError) -> Self {
        DepolError::Storage(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_too_large_message_uses_megabytes() {
        let e = DepolError::payload_too_large(300 * 1024 * 1024);
        assert_eq!(e.to_string(), "File too large (max size 300 MB)");
        assert_eq!(e.kind(), ErrorKind::PayloadTooLarge);
    }

    #[test]
    fn store_not_found_is_classified_as_not_found() {
        let e: DepolError = StoreError::NotFound("gone.bin".into()).into();
        assert_eq!(e.kind(), ErrorKind::NotFound);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let e: DepolError = StoreError::Io {
            name: "x".into(),
            source: io,
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::Storage);
    }
}
