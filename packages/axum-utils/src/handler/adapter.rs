//! # ハンドラ変換
//!
//! axum 以外の形で書かれたハンドラを axum のハンドラに変換する。
//!
//! - [`adapt`]: tower `Service<Request>`（hyper / tower エコシステムの既存ハンドラ）
//! - [`adapt_fn`]: `Fn(Request) -> impl IntoResponse` の同期関数
//!
//! 変換後のハンドラには生のリクエストだけが渡される。
//! ルーターが抽出したパスパラメータなどは個別の引数としては受け取れない。
//!
//! Service をそのままルーティングするだけなら `Router::route_service` でもよい。
//! [`adapt`] はメソッドルーター（`get(...)` など）と組み合わせたい場合や、
//! Service のエラーを 500 レスポンスに変換したい場合に使う。

use std::fmt::Display;

use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
};
use tower::{Service, ServiceExt};

use super::{HandlerFuture, result::error_result};

/// tower `Service` を axum ハンドラに変換する
///
/// Service がエラーを返した場合はログに記録し、500 のエラーレスポンスを返す。
/// エラーの詳細はクライアントには返さない。
pub fn adapt<S, R>(service: S) -> impl Fn(Request) -> HandlerFuture + Clone + Send + Sync + 'static
where
    S: Service<Request, Response = R> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Error: Display + Send + 'static,
    R: IntoResponse + 'static,
{
    move |request: Request| {
        let service = service.clone();
        Box::pin(async move {
            match service.oneshot(request).await {
                Ok(response) => response.into_response(),
                Err(err) => {
                    tracing::error!(error.message = %err, "変換したハンドラでエラーが発生しました");
                    error_result(StatusCode::INTERNAL_SERVER_ERROR, &[])
                }
            }
        }) as HandlerFuture
    }
}

/// 同期関数を axum ハンドラに変換する
///
/// 関数はランタイムのワーカースレッド上でそのまま実行される。
/// ブロッキング I/O を行う関数は渡さないこと。
pub fn adapt_fn<F, R>(f: F) -> impl Fn(Request) -> HandlerFuture + Clone + Send + Sync + 'static
where
    F: Fn(Request) -> R + Clone + Send + Sync + 'static,
    R: IntoResponse + 'static,
{
    move |request: Request| {
        let response = f(request).into_response();
        Box::pin(std::future::ready(response)) as HandlerFuture
    }
}
