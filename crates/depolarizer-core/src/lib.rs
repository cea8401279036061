//! depolarizer-core
//!
//! Upload → transform → notify → serve → expire パイプラインの中核。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, blob 名, サンプル, 進捗イベント, セッション状態, errors）
//! - **ports**: 抽象化レイヤー（BlobStore, Transform, ProgressSink, Clock, IdGenerator）
//! - **impls**: ports の実装（FsBlobStore, ComplementTransform, ChannelSink, 開発用の InMemory 系）
//! - **app**: アプリケーションロジック（config, builder, pacer, expiry, upload, pipeline, download）
//!
//! HTTP ルーティングや WebSocket の配線は `depolarizer-server` 側にあり、
//! このクレートはフレームワークに依存しない。

pub mod domain;
pub mod ports;
pub mod impls;
pub mod app;
