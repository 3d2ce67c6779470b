//! # Graceful shutdown のデモ
//!
//! `/exit` にアクセスすると自プロセスに SIGINT が送られ、
//! Ctrl+C と同じ経路で Graceful shutdown する。
//!
//! ```bash
//! cargo run -p axum-utils-template --bin demo-shutdown
//! curl localhost:55555/exit
//! ```

use axum::{Router, routing::get};
use axum_utils::{
    Graceful, RequestLogLayer, handler,
    observability::{LogFormat, TracingConfig, init_tracing},
};

const PORT: u16 = 55555;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(TracingConfig::new("demo-shutdown", LogFormat::from_env()))?;

    // /exit が送る SIGINT を捕捉するため、ルーター構築より先に登録する
    let mut graceful = Graceful::initialize()?;

    let app = Router::new()
        .route("/ping", get(handler::ping))
        .route("/exit", get(handler::exit))
        .layer(RequestLogLayer::new());

    tracing::info!("停止: http://localhost:{PORT}/exit");
    let served = graceful.serve(app, PORT).await;
    graceful.close().await;
    served?;

    tracing::info!("デモサーバーを終了しました");
    Ok(())
}
