//! # リクエストログミドルウェア
//!
//! HTTP リクエスト完了時に、メソッド・パス・ステータス・レイテンシ・
//! クライアント情報を 1 行に集約したログを出力する tower Layer。
//!
//! フレームワーク標準のアクセスログ（テキスト整形して stdout に出すもの）の
//! 代わりに使用し、すべてのリクエストログを構造化ログとして扱えるようにする。
//!
//! ## レベル
//!
//! | ステータス | レベル |
//! |------------|--------|
//! | 5xx | ERROR |
//! | 4xx | WARN |
//! | それ以外 | INFO |
//!
//! ## レイヤー配置
//!
//! `TraceLayer` の内側に配置すると、スパンフィールド（request_id など）が
//! ログに自動的に含まれる:
//!
//! ```text
//! TraceLayer → RequestLogLayer → [他のミドルウェア] → handler
//! ```

use std::{
    collections::HashSet,
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};

use axum::extract::ConnectInfo;
use http::{Request, Response, StatusCode, header};
use tower::{Layer, Service};

/// 値が取得できない場合の表記
const UNKNOWN: &str = "-";

/// リクエストログを出力する Layer
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/ping", get(handler::ping))
///     .route("/health", get(handler::health_check))
///     .layer(RequestLogLayer::new().skip_path("/health"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestLogLayer {
    skip_paths: Arc<HashSet<String>>,
}

impl RequestLogLayer {
    /// すべてのパスを記録する Layer を作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定パス（完全一致）をログ出力対象から除外する
    pub fn skip_path(mut self, path: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.skip_paths).insert(path.into());
        self
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService {
            inner,
            skip_paths: self.skip_paths.clone(),
        }
    }
}

/// リクエストログを出力する Service
///
/// [`RequestLogLayer`] が生成する Service 実装。
#[derive(Clone, Debug)]
pub struct RequestLogService<S> {
    inner:      S,
    skip_paths: Arc<HashSet<String>>,
}

/// レスポンス前に取得しておくリクエスト情報
struct RequestInfo {
    method:     String,
    path:       String,
    query:      String,
    client_ip:  String,
    user_agent: String,
}

impl RequestInfo {
    fn from_request<B>(req: &Request<B>) -> Self {
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(UNKNOWN)
            .to_string();

        Self {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().unwrap_or_default().to_string(),
            client_ip: client_ip(req),
            user_agent,
        }
    }
}

/// クライアント IP を決定する
///
/// `X-Forwarded-For` の先頭要素 → `ConnectInfo<SocketAddr>` の順に参照する。
fn client_ip<B>(req: &Request<B>) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn log_response(info: &RequestInfo, status: StatusCode, latency_ms: u64) {
    let status_code = status.as_u16();

    macro_rules! emit {
        ($level:ident) => {
            tracing::$level!(
                http.method = %info.method,
                http.path = %info.path,
                http.query = %info.query,
                http.status_code = status_code,
                http.latency_ms = latency_ms,
                http.client_ip = %info.client_ip,
                http.user_agent = %info.user_agent,
                "リクエスト完了"
            )
        };
    }

    if status.is_server_error() {
        emit!(error);
    } else if status.is_client_error() {
        emit!(warn);
    } else {
        emit!(info);
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLogService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Display + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // clone-swap パターン: poll_ready で得た readiness を保持する inner を使う
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if self.skip_paths.contains(req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        let info = RequestInfo::from_request(&req);
        let start = Instant::now();

        Box::pin(async move {
            let result = inner.call(req).await;
            let latency_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(response) => log_response(&info, response.status(), latency_ms),
                Err(err) => {
                    tracing::error!(
                        http.method = %info.method,
                        http.path = %info.path,
                        http.latency_ms = latency_ms,
                        error.message = %err,
                        "リクエスト処理エラー"
                    );
                }
            }

            result
        })
    }
}
