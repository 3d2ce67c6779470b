//! # 簡易レスポンス
//!
//! JSON レスポンスとプレーンテキストのエラーレスポンスを生成する。
//! アプリケーション固有のエラー形式がある場合はそちらを使うこと。

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub(crate) const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub(crate) const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub(crate) const NOSNIFF: &str = "nosniff";

/// プレーンテキストのエラーレスポンスを返す
///
/// 本文は 1 行目にステータスの標準テキスト（例: `Internal Server Error`）、
/// 続けて `texts` を 1 行ずつ出力する。
/// `X-Content-Type-Options: nosniff` を付与し、ブラウザによる型推測を防ぐ。
pub fn error_result(status: StatusCode, texts: &[&str]) -> Response {
    let mut body = String::new();
    body.push_str(status.canonical_reason().unwrap_or_default());
    body.push('\n');
    for text in texts {
        body.push_str(text);
        body.push('\n');
    }

    (
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_TEXT)),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static(NOSNIFF),
            ),
        ],
        body,
    )
        .into_response()
}

/// 任意のオブジェクトを JSON として 200 OK で返す
///
/// シリアライズに失敗した場合は 500 のエラーレスポンスを返す。
pub fn json_result<T: Serialize + ?Sized>(object: &T) -> Response {
    match serde_json::to_vec(object) {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON))],
            Body::from(bytes),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "JSON シリアライズに失敗しました");
            error_result(StatusCode::INTERNAL_SERVER_ERROR, &[&err.to_string()])
        }
    }
}
