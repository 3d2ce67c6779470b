//! # サーバー設定
//!
//! 環境変数から HTTP サーバーの設定を読み込む。
//!
//! ## 環境変数一覧
//!
//! | 変数名 | 必須 | デフォルト | 説明 |
//! |--------|------|------------|------|
//! | `HOST` | No | `0.0.0.0` | バインドアドレス |
//! | `PORT` | No | `8080` | ポート番号（1〜65535） |
//!
//! `Serialize` / `Deserialize` を実装しているため、JSON や YAML の設定ファイルに
//! そのまま埋め込むこともできる。

use std::{env, net::SocketAddr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// デフォルトのバインドアドレス
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// デフォルトのポート番号
pub const DEFAULT_PORT: u16 = 8080;

/// HTTP サーバー設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// バインドアドレス（例: `0.0.0.0`, `127.0.0.1`）
    pub host: String,
    /// ポート番号
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// 環境変数から設定を読み込む
    ///
    /// 未設定の項目はデフォルト値を使用する。
    /// `PORT` が設定されていて不正な値の場合はエラーを返す。
    pub fn from_env() -> Result<Self> {
        let host = env::var("HOST")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_port(env::var("PORT").ok().as_deref())?;

        Ok(Self { host, port })
    }

    /// バインド先の `SocketAddr` を返す
    pub fn addr(&self) -> Result<SocketAddr> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| Error::InvalidAddress(raw))
    }
}

/// ポート番号をパースする
///
/// 未設定（`None` または空文字）の場合は [`DEFAULT_PORT`] を返す。
/// 0 はバインド時に OS が任意のポートを割り当ててしまうため不正とする。
fn parse_port(raw: Option<&str>) -> Result<u16> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DEFAULT_PORT),
        Some(value) => match value.parse::<u16>() {
            Ok(0) | Err(_) => Err(Error::InvalidPort(value.to_string())),
            Ok(port) => Ok(port),
        },
    }
}
