//! 進捗チャネル（WebSocket）
//!
//! 1 接続につき ChannelSink を 1 本作り、その接続で始まったセッションはすべてそこへ送る。
//! 送信は `select!` ループだけが行うので、ソケットへの書き込みは直列になる。

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::Response;
use serde::Deserialize;

use depolarizer_core::app::ProcessRequest;
use depolarizer_core::domain::ProgressEvent;
use depolarizer_core::impls::ChannelSink;
use depolarizer_core::ports::ProgressSink;

use crate::http::AppState;

/// クライアントから届くメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    StartProcessing { filename: String },
}

impl ClientCommand {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>, headers: HeaderMap) -> Response {
    let base = download_base(state.public_base_url.as_deref(), &headers);
    ws.on_upgrade(move |socket| serve_socket(socket, state, base))
}

/// `public_base_url` があればそれを、なければ Host ヘッダから `http://host` を使う
pub fn download_base(public_base_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = public_base_url {
        return base.to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

async fn serve_socket(mut socket: WebSocket, state: AppState, base: String) {
    let (sink, mut events) = ChannelSink::channel();
    tracing::info!(base = %base, "progress channel connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => on_text(text.as_str(), &state, &sink, &base),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "progress channel read failed");
                    break;
                }
            },
            Some(event) = events.recv() => {
                let text = match serde_json::to_string(&event.to_wire()) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "progress event encode failed");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
                if event.is_terminal() {
                    tracing::debug!(event = ?event, "session result delivered");
                }
            }
        }
    }

    // 走行中のセッションは止めない。以降のイベントは捨てられる
    tracing::info!("progress channel closed");
}

fn on_text(text: &str, state: &AppState, sink: &ChannelSink, base: &str) {
    match ClientCommand::parse(text) {
        Ok(ClientCommand::StartProcessing { filename }) => {
            let pipeline = state.app.pipeline.clone();
            let sink = sink.clone();
            let request = ProcessRequest {
                source_name: filename,
                download_base: base.to_string(),
            };
            tokio::spawn(async move {
                // 結果はすべて sink に届いている
                let _ = pipeline.run(request, &sink).await;
            });
        }
        Err(e) => {
            tracing::debug!(error = %e, "malformed progress message");
            let reply = ProgressEvent::Failed {
                message: format!("invalid message: {e}"),
            };
            if sink.send(reply).is_err() {
                tracing::debug!("progress channel already closed");
            }
        }
    }
}
