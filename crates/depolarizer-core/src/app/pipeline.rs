//! UploadPipeline - "start processing" 1 回分のオーケストレーション
//!
//! # フロー
//! 1. 元 Blob の存在確認。なければ `processing_error` を 1 回だけ送って終了
//! 2. `initiating_depolarization` を即時送信（ここでペーシングの基準時刻が決まる）
//! 3. Reading: `reading_file` → 読み出し → 元データのサンプル
//! 4. Transforming: パスごとに `flipping_bits_status` → Transform → サンプル
//! 5. Writing: 派生名で保存
//! 6. Scheduling: 派生 Blob の遅延削除を登録（失敗しない）
//! 7. Completing: `complete_message` → `file_ready`
//! 8. Done: 元 Blob をベストエフォートで削除（失敗はログのみ）
//!
//! 2 以降の失敗は `processing_error` をペーシングして 1 回だけ送る。
//! リトライはせず、書きかけの派生 Blob も片付けない。
//!
//! # 既知の挙動
//! ビット反転は自己逆写像なので、デフォルトの 2 パスでは派生 Blob は元データとビット単位で一致する。
//! 観測可能な挙動として維持している（`transform_passes` で変更可能）。

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use url::Url;

use super::expiry::{ExpiryScheduler, ExpiryTask};
use super::pacer::Pacer;
use crate::domain::{
    DepolError, ProcessingSession, ProgressEvent, SessionId, SessionState, Stage, derived_name,
    leading_bits,
};
use crate::ports::{BlobStore, Clock, IdGenerator, ProgressSink, Transform};

pub const FILE_NOT_FOUND_MESSAGE: &str = "File not found on server";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub pacing_interval: Duration,
    pub expiry_delay: Duration,
    pub transform_passes: u32,
    pub derived_suffix: String,
}

/// "start processing" の引数
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub source_name: String,
    /// `file_ready` の URL の基準（例: `http://localhost:5001`）
    pub download_base: String,
}

/// 成功したセッションの結果
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session: SessionId,
    pub derived_name: String,
    pub download_url: String,
    pub expiry: ExpiryTask,
}

#[derive(Clone)]
pub struct UploadPipeline {
    store: Arc<dyn BlobStore>,
    transform: Arc<dyn Transform>,
    expiry: ExpiryScheduler,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    settings: PipelineSettings,
}

impl UploadPipeline {
    pub fn new(
        store: Arc<dyn BlobStore>,
        transform: Arc<dyn Transform>,
        expiry: ExpiryScheduler,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            transform,
            expiry,
            ids,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// 1 セッションを最後まで実行する。
    ///
    /// 結果はすべて `sink` へのイベントとして届く。戻り値はログとテストのためのもので、
    /// 失敗時もすでに `processing_error` は送信済み。
    pub async fn run(
        &self,
        request: ProcessRequest,
        sink: &dyn ProgressSink,
    ) -> Result<SessionReport, DepolError> {
        let session = ProcessingSession::new(
            self.ids.generate_session_id(),
            request.source_name,
            request.download_base,
            self.clock.now(),
        );
        let span = tracing::info_span!("session", session = %session.id, source = %session.source_name);
        self.run_session(session, sink).instrument(span).await
    }

    async fn run_session(
        &self,
        mut session: ProcessingSession,
        sink: &dyn ProgressSink,
    ) -> Result<SessionReport, DepolError> {
        if !self.store.exists(&session.source_name).await {
            session.enter(SessionState::Failed);
            tracing::warn!("source blob missing");
            notify(sink, ProgressEvent::Failed {
                message: FILE_NOT_FOUND_MESSAGE.to_string(),
            });
            return Err(DepolError::NotFound(FILE_NOT_FOUND_MESSAGE.to_string()));
        }

        notify(sink, ProgressEvent::StageStarted(Stage::InitiatingDepolarization));
        let mut pacer = Pacer::start(sink, self.settings.pacing_interval);

        match self.drive(&mut session, &mut pacer).await {
            Ok(report) => {
                session.enter(SessionState::Done);
                self.discard_source(&session.source_name).await;
                tracing::info!(derived = %report.derived_name, "session done");
                Ok(report)
            }
            Err(e) => {
                let failed_in = session.state();
                session.enter(SessionState::Failed);
                tracing::warn!(state = ?failed_in, error = %e, "session failed");
                pacer
                    .emit(ProgressEvent::Failed {
                        message: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        session: &mut ProcessingSession,
        pacer: &mut Pacer<'_>,
    ) -> Result<SessionReport, DepolError> {
        session.enter(SessionState::Reading);
        pacer.emit(ProgressEvent::StageStarted(Stage::ReadingFile)).await;
        let source = self.store.get(&session.source_name).await?;
        pacer
            .emit(ProgressEvent::StageResult {
                stage: Stage::ReadingFile,
                sample_bits: leading_bits(&source),
            })
            .await;

        let mut data = source.to_vec();
        for pass in 1..=self.settings.transform_passes {
            session.enter(SessionState::Transforming(pass));
            pacer.emit(ProgressEvent::StageStarted(Stage::FlippingBits)).await;
            data = self.apply_transform(data).await?;
            pacer
                .emit(ProgressEvent::StageResult {
                    stage: Stage::FlippingBits,
                    sample_bits: leading_bits(&data),
                })
                .await;
        }

        session.enter(SessionState::Writing);
        let derived = derived_name(&session.source_name, &self.settings.derived_suffix);
        self.store.put(&derived, &data).await?;

        session.enter(SessionState::Scheduling);
        let expiry = self.expiry.schedule_delete(&derived, self.settings.expiry_delay);

        session.enter(SessionState::Completing);
        let download_url = download_url(&session.download_base, &derived)?;
        pacer.emit(ProgressEvent::Completed).await;
        pacer
            .emit(ProgressEvent::Ready {
                download_url: download_url.clone(),
            })
            .await;

        Ok(SessionReport {
            session: session.id,
            derived_name: derived,
            download_url,
            expiry,
        })
    }

    /// CPU バウンドな Transform はブロッキングプールで走らせ、他のセッションを止めない
    async fn apply_transform(&self, data: Vec<u8>) -> Result<Vec<u8>, DepolError> {
        let transform = Arc::clone(&self.transform);
        tokio::task::spawn_blocking(move || transform.apply(&data))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, stage = self.transform.name(), "transform task failed");
                DepolError::TransformAborted {
                    stage: self.transform.name().to_string(),
                }
            })
    }

    async fn discard_source(&self, name: &str) {
        if let Err(e) = self.store.delete(name).await {
            tracing::warn!(blob = name, error = %e, "source blob cleanup failed");
        }
    }
}

fn notify(sink: &dyn ProgressSink, event: ProgressEvent) {
    if let Err(e) = sink.send(event) {
        tracing::debug!(error = %e, "progress event dropped");
    }
}

/// `{base}/download/{name}`。name は 1 セグメントとしてパーセントエンコードされる。
pub fn download_url(base: &str, name: &str) -> Result<String, DepolError> {
    let invalid = |source| DepolError::InvalidDownloadBase {
        base: base.to_string(),
        source,
    };
    let mut url = Url::parse(base).map_err(invalid)?;
    url.path_segments_mut()
        .map_err(|()| invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push("download")
        .push(name);
    Ok(url.to_string())
}
