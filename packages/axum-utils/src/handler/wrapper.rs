//! # ハンドララッパー
//!
//! 任意の状態を持つハンドラオブジェクト（[`CanServe`]）を、
//! オプション付きで axum ハンドラに変換する。
//!
//! 1 つの [`Wrapper`] から生成したハンドラは複数のルートに登録できる。

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{HeaderValue, header},
    response::Response,
};

use super::HandlerFuture;

/// ラップされて提供されるハンドラ
///
/// 実装は任意に複雑でよく、固有のパラメータを持って構築できる。
#[async_trait]
pub trait CanServe: Send + Sync + 'static {
    async fn serve(&self, request: Request) -> Response;
}

/// [`Wrapper`] のオプション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// `Access-Control-Allow-Origin: *` を付与する
    ///
    /// ローカルでの動作確認用。本番環境では有効にしないこと。
    pub cors: bool,
}

/// [`CanServe`] と [`Options`] の組
pub struct Wrapper<T> {
    wrapped: Arc<T>,
    options: Options,
}

impl<T> Clone for Wrapper<T> {
    fn clone(&self) -> Self {
        Self {
            wrapped: self.wrapped.clone(),
            options: self.options,
        }
    }
}

impl<T: CanServe> Wrapper<T> {
    /// 新しいラッパーを作成する
    pub fn new(wrapped: T, options: Options) -> Self {
        Self {
            wrapped: Arc::new(wrapped),
            options,
        }
    }

    /// 設定されたオプション
    pub fn options(&self) -> Options {
        self.options
    }

    /// axum ハンドラを返す
    pub fn handler(&self) -> impl Fn(Request) -> HandlerFuture + Clone + Send + Sync + 'static {
        let wrapped = self.wrapped.clone();
        let options = self.options;

        move |request: Request| {
            let wrapped = wrapped.clone();
            Box::pin(async move {
                let mut response = wrapped.serve(request).await;
                if options.cors {
                    response.headers_mut().insert(
                        header::ACCESS_CONTROL_ALLOW_ORIGIN,
                        HeaderValue::from_static("*"),
                    );
                }
                response
            }) as HandlerFuture
        }
    }
}
