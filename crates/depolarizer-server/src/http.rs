//! HTTP ルーティング（axum）
//!
//! - `GET /`: 生存確認
//! - `POST /upload`: multipart の `file` フィールドを保存
//! - `GET /download/{filename}`: 保存済み Blob をそのまま返す
//! - `GET /ws`: 進捗チャネル（`ws.rs`）

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;

use depolarizer_core::app::{App, NO_FILE_PART, UploadPart, UploadReceipt};
use depolarizer_core::domain::{DepolError, ErrorKind};

use crate::ws;

pub const LIVENESS_TEXT: &str = "Hello WORD.";

#[derive(Clone)]
pub struct AppState {
    pub app: App,
    /// `file_ready` の URL の基準。None なら WebSocket リクエストの Host から組み立てる
    pub public_base_url: Option<Arc<str>>,
}

impl AppState {
    pub fn new(app: App, public_base_url: Option<String>) -> Self {
        Self {
            app,
            public_base_url: public_base_url.map(Arc::from),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.app.upload.max_upload_bytes()).unwrap_or(usize::MAX);
    Router::new()
        .route("/", get(liveness))
        .route("/upload", post(upload).layer(DefaultBodyLimit::max(body_limit)))
        .route("/download/{filename}", get(download))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
}

/// `{"error": message}` と ErrorKind に応じたステータス
#[derive(Debug)]
pub struct ApiError(pub DepolError);

impl From<DepolError> for ApiError {
    fn from(e: DepolError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadReceipt>, ApiError> {
    let uploads = &state.app.upload;
    if let Some(len) = declared_len(&headers) {
        uploads.check_declared_len(len)?;
    }

    // multipart でないリクエストは `file` フィールドがないのと同じ扱い
    let part = match multipart {
        Ok(mut multipart) => file_part(&mut multipart, uploads.max_upload_bytes()).await?,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "upload is not multipart");
            return Err(DepolError::Validation(NO_FILE_PART.to_string()).into());
        }
    };

    Ok(Json(uploads.accept(part).await?))
}

/// 最初の `file` ファイルフィールドを取り出す。filename のないフィールドはフォーム値なので無視する
async fn file_part(multipart: &mut Multipart, max_bytes: u64) -> Result<Option<UploadPart>, DepolError> {
    let body_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            DepolError::payload_too_large(max_bytes)
        } else {
            DepolError::Validation(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(body_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(body_error)?;
        return Ok(Some(UploadPart { filename, bytes }));
    }
    Ok(None)
}

fn declared_len(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let d = state.app.download.fetch(&filename).await?;
    let content_type = HeaderValue::from_str(&d.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let headers = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_LENGTH, HeaderValue::from(d.info.len)),
    ];
    Ok((StatusCode::OK, headers, d.bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use depolarizer_core::app::{AppBuilder, AppConfig};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "depolarizer-test-boundary";

    async fn test_router(max_upload_bytes: u64) -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default()
            .with_upload_dir(dir.path())
            .with_max_upload_bytes(max_upload_bytes);
        let app = AppBuilder::new(config).build().await.unwrap();
        (router(AppState::new(app, None)), dir)
    }

    fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
        let disposition = match filename {
            Some(f) => format!("form-data; name=\"{field}\"; filename=\"{f}\""),
            None => format!("form-data; name=\"{field}\""),
        };
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::post("/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn liveness_returns_fixed_text() {
        let (router, _dir) = test_router(1024).await;
        let res = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], LIVENESS_TEXT.as_bytes());
    }

    #[tokio::test]
    async fn upload_without_file_field_is_400() {
        let (router, _dir) = test_router(1024).await;
        let res = router
            .oneshot(upload_request(multipart_body("other", Some("a.bin"), b"abc")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["error"], "No file part");
    }

    #[tokio::test]
    async fn non_multipart_upload_is_400() {
        let (router, _dir) = test_router(1024).await;
        let req = Request::post("/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let res = router.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["error"], "No file part");
    }

    #[tokio::test]
    async fn upload_with_empty_filename_is_400() {
        let (router, dir) = test_router(1024).await;
        let res = router
            .oneshot(upload_request(multipart_body("file", Some(""), b"abc")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["error"], "No selected file");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_413() {
        let (router, dir) = test_router(1024 * 1024).await;
        let big = vec![7u8; 1024 * 1024 + 1];
        let res = router
            .oneshot(upload_request(multipart_body("file", Some("big.bin"), &big)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(res).await["error"], "File too large (max size 1 MB)");
        assert!(!dir.path().join("big.bin").exists());
    }

    #[tokio::test]
    async fn uploaded_file_can_be_downloaded() {
        let (router, dir) = test_router(1024).await;
        let res = router
            .clone()
            .oneshot(upload_request(multipart_body("file", Some("photo.png"), b"\x00\xFF\x01\xFE\x10\x20")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let receipt = json_body(res).await;
        assert_eq!(receipt["message"], "File successfully uploaded");
        assert_eq!(receipt["filename"], "photo.png");
        assert_eq!(receipt["data_head"], "00ff01fe10");
        assert_eq!(receipt["data_head_flipped"], "ff00fe01ef");
        assert!(dir.path().join("photo.png").is_file());

        let res = router
            .oneshot(Request::get("/download/photo.png").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(res.headers()[header::CONTENT_LENGTH], "6");
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"\x00\xFF\x01\xFE\x10\x20");
    }

    #[tokio::test]
    async fn unknown_download_is_404() {
        let (router, _dir) = test_router(1024).await;
        let res = router
            .oneshot(Request::get("/download/missing.bin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await["error"], "File not found or has expired");
    }
}
