//! # axum-utils
//!
//! axum アプリケーション向けの小さなユーティリティ集。
//!
//! ## 設計方針
//!
//! - ルーティングやビジネスロジックは持たない。フレームワークを薄く補助するだけ
//! - ログはすべて `tracing` に集約する（フレームワーク内部の出力も含む）
//! - 外部クレートへの依存は axum / tower / tracing 周辺に限定する
//!
//! ## モジュール構成
//!
//! - [`config`] - サーバー設定（環境変数からの読み込み）
//! - [`error`] - エラー定義
//! - [`observability`] - トレーシング初期化、Request ID
//! - [`log_writer`] - `io::Write` 出力を tracing イベントに変換する
//! - [`request_log`] - リクエストごとに 1 行のログを出力する tower Layer
//! - [`handler`] - ハンドラ変換、レスポンスヘルパー、汎用ハンドラ
//! - [`shutdown`] - シグナル駆動の Graceful shutdown
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use axum_utils::{Graceful, RequestLogLayer, handler};
//!
//! let mut graceful = Graceful::initialize()?;
//! let router = Router::new()
//!     .route("/ping", get(handler::ping))
//!     .layer(RequestLogLayer::new());
//!
//! graceful.serve(router, 8080).await?;
//! graceful.close().await;
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod log_writer;
pub mod observability;
pub mod request_log;
pub mod shutdown;

#[cfg(test)]
mod test_support;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use log_writer::LogWriter;
pub use request_log::RequestLogLayer;
pub use shutdown::{Graceful, InterruptHandle};
