//! # エラー定義
//!
//! ライブラリ全体で使用するエラー型。
//!
//! ## 設計方針
//!
//! - **thiserror**: `std::error::Error` と `Display` を自動実装する
//! - 下位の I/O エラーは `#[source]` で保持し、エラーチェインを辿れるようにする
//! - バイナリ側では `anyhow::Result` にそのまま `?` で変換できる

use std::{io, net::SocketAddr, path::PathBuf};

use thiserror::Error;

/// ライブラリの Result 型
pub type Result<T> = std::result::Result<T, Error>;

/// axum-utils で発生するエラー
#[derive(Debug, Error)]
pub enum Error {
    /// ポート番号が不正（数値でない、範囲外、0）
    #[error("ポート番号が不正です: {0:?}")]
    InvalidPort(String),

    /// バインドアドレスが不正
    #[error("バインドアドレスが不正です: {0:?}")]
    InvalidAddress(String),

    /// ログファイルを開けない
    #[error("ログファイルを開けません: {}", path.display())]
    LogFile {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    /// グローバル subscriber の設定に失敗した（二重初期化など）
    #[error("トレーシングの初期化に失敗しました: {0}")]
    TracingInit(String),

    /// シグナルハンドラを登録できない
    #[error("シグナルハンドラの登録に失敗しました")]
    SignalHandler(#[source] io::Error),

    /// リスナーをバインドできない
    #[error("アドレスへのバインドに失敗しました: {addr}")]
    Bind {
        addr:   SocketAddr,
        #[source]
        source: io::Error,
    },

    /// サーバーが異常終了した
    #[error("サーバーの実行に失敗しました")]
    Serve(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_invalid_portのメッセージに入力値が含まれる() {
        let error = Error::InvalidPort("abc".to_string());

        assert_eq!(error.to_string(), "ポート番号が不正です: \"abc\"");
    }

    #[test]
    fn test_log_fileのsourceが辿れる() {
        let error = Error::LogFile {
            path:   PathBuf::from("/nonexistent/app.log"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };

        assert!(error.to_string().contains("/nonexistent/app.log"));
        assert_eq!(error.source().unwrap().to_string(), "missing");
    }
}
