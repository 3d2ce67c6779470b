//! # リクエストログのデモ
//!
//! `RequestLogLayer` だけを組み込んだ最小構成のサーバー。
//! `curl localhost:55555/ping` でリクエストログが 1 行出力されることを確認できる。
//!
//! Graceful shutdown は行わないため、Ctrl+C で即座に終了する。

use axum::{Router, routing::get};
use axum_utils::{
    RequestLogLayer, handler,
    observability::{LogFormat, TracingConfig, init_tracing},
};
use tokio::net::TcpListener;

const PORT: u16 = 55555;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(TracingConfig::new("demo-request-log", LogFormat::from_env()))?;

    let app = Router::new()
        .route("/ping", get(handler::ping))
        .layer(RequestLogLayer::new());

    let listener = TcpListener::bind(("0.0.0.0", PORT)).await?;
    tracing::info!(port = PORT, "デモサーバーを起動しました");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
