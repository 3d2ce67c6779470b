//! # 汎用ハンドラ
//!
//! どのサーバーにもそのまま登録できる小さなハンドラ群。

use axum::{Json, response::Html};
use serde::Serialize;
use serde_json::{Value, json};

use super::page::{LINK_TABLE_STYLE_SHEET, LinkDef, centered_page, links};

/// `{"message": "pong"}` を返す
///
/// サーバーの死活確認用。
pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

/// 自プロセスに SIGINT を送り、シャットダウンを開始させる
///
/// [`Graceful`](crate::Graceful) で待機しているサーバーであれば
/// Graceful shutdown が始まる。シグナルハンドラが登録されていない
/// プロセスでは即座に終了するため、登録するルートには注意すること。
pub async fn exit() -> Html<String> {
    if let Err(err) = interrupt_self() {
        tracing::error!(error = %err, "サーバーへの割り込みに失敗しました");
    }
    centered_page("Exit", "Server shutting down via SIGINT")
}

#[cfg(unix)]
fn interrupt_self() -> Result<(), nix::Error> {
    use nix::{
        sys::signal::{Signal, kill},
        unistd::Pid,
    };

    kill(Pid::this(), Signal::SIGINT)
}

#[cfg(not(unix))]
fn interrupt_self() -> Result<(), std::io::Error> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "SIGINT の送信は unix 系 OS のみ対応しています",
    ))
}

/// `/ping` と `/exit` へのリンク一覧ページを返す
///
/// サーバーにこれらのルートが登録されていないとリンクは機能しない。
pub async fn link() -> Html<String> {
    links(
        LINK_TABLE_STYLE_SHEET,
        &[
            LinkDef::new("/ping", "Ping", "server existence"),
            LinkDef::new("/exit", "Exit", "graceful shut down"),
        ],
    )
}

/// ヘルスチェックレスポンス
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 稼働状態（`"healthy"` 固定）
    pub status:  String,
    /// クレートのバージョン
    pub version: String,
}

/// ヘルスチェックエンドポイント
///
/// 依存サービスは確認せず、プロセスが応答できることだけを返す。
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
