//! # テンプレートサーバー
//!
//! axum-utils の機能を一通り組み込んだサーバーのひな形。
//! 新しいサービスを作るときはこのファイルをコピーして始める。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `PORT` | No | ポート番号（デフォルト: `8080`） |
//! | `LOG_FORMAT` | No | `json` または `pretty`（デフォルト: `pretty`） |
//! | `LOG_FILE` | No | ログの出力先ファイル（未設定なら標準エラー出力） |
//! | `RUST_LOG` | No | ログレベルのフィルタ |
//!
//! ## 起動方法
//!
//! ```bash
//! LOG_FORMAT=pretty PORT=3000 cargo run -p axum-utils-template --bin template
//! ```
//!
//! `/exit` にアクセスするか Ctrl+C で Graceful shutdown する。

use axum::{Json, Router, routing::get};
use axum_utils::{
    Graceful, RequestLogLayer, ServerConfig, handler,
    log_writer::install_panic_hook,
    observability::{MakeRequestUuidV7, TracingConfig, init_tracing, make_request_span},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::Instrument;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

const SERVICE_NAME: &str = "template";

/// サーバーのエントリーポイント
///
/// 以下の順序で初期化を行う:
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. トレーシングの初期化
/// 3. 設定の読み込みとシグナルハンドラの登録
/// 4. ルーターの構築
/// 5. 停止要求までサーバーを稼働させ、Graceful shutdown する
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    let tracing_config = TracingConfig::from_env(SERVICE_NAME);
    let service_name = tracing_config.service_name.clone();

    // ログファイルを開けない場合は起動しない
    if let Err(err) = init_tracing(tracing_config) {
        eprintln!("トレーシングの初期化に失敗しました: {err}");
        return Err(err.into());
    }
    install_panic_hook();

    run()
        .instrument(tracing::info_span!("app", service = %service_name))
        .await
}

/// 停止要求までサーバーを稼働させ、Graceful shutdown する
async fn run() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    let mut graceful = Graceful::initialize()?;

    let stop = graceful.interrupt_handle();
    let app = Router::new()
        .route("/ping", get(handler::ping))
        .route(
            "/exit",
            get(move || {
                let stop = stop.clone();
                async move {
                    tracing::info!("/exit によりサーバーを停止します");
                    stop.interrupt();
                    Json::<Value>(json!({ "message": "exiting" }))
                }
            }),
        )
        .route("/links", get(handler::link))
        .route("/health", get(handler::health_check))
        .layer(RequestLogLayer::new().skip_path("/health"))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));

    let addr = config.addr()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "サーバーを起動します");
    tracing::info!("リンク一覧: http://localhost:{}/links", config.port);
    tracing::info!("停止: http://localhost:{}/exit", config.port);

    let served = graceful.serve_listener(app, listener).await;
    graceful.close().await;
    served?;

    tracing::info!("サーバーを終了しました");
    Ok(())
}
