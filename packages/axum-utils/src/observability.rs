//! # Observability 基盤
//!
//! トレーシング初期化とログ出力先・出力形式の設定を提供する。
//! 環境変数 `LOG_FORMAT` による JSON / Pretty 出力の切り替えと、
//! `LOG_FILE` によるコンソール / ファイル出力の切り替えに対応する。
//!
//! 依存クレートが `log` クレート経由で出力するレコードも、
//! tracing-subscriber の `tracing-log` ブリッジにより同じ subscriber に流れる。

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Arc,
};

use http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Request ID を伝播する HTTP ヘッダー名
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// `RUST_LOG` 未設定時のフィルタ
const DEFAULT_FILTER: &str = "info,axum_utils=debug";

/// ログ出力形式
///
/// 環境変数 `LOG_FORMAT` で切り替える。
/// 値が未設定または不正な場合は [`Pretty`](LogFormat::Pretty) にフォールバックする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（本番環境向け）
    Json,
    /// 人間が読みやすい形式（開発環境向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// 文字列からログ形式をパースする
    ///
    /// 不正な値の場合は [`Pretty`](LogFormat::Pretty) にフォールバックし、
    /// stderr に警告を出力する。
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }

    /// 環境変数 `LOG_FORMAT` から読み取る
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(val) => Self::parse(&val),
            Err(_) => Self::default(),
        }
    }
}

/// ログ出力先
///
/// 環境変数 `LOG_FILE` にパスが設定されていればファイル（追記）、
/// 未設定または空文字ならコンソール（stderr）に出力する。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogOutput {
    /// 標準エラー出力
    #[default]
    Console,
    /// 指定ファイルへの追記
    File(PathBuf),
}

impl LogOutput {
    /// `LOG_FILE` の値から出力先を決定する
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Console,
            Some(path) => Self::File(PathBuf::from(path)),
        }
    }

    /// 環境変数 `LOG_FILE` から読み取る
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FILE").ok().as_deref())
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// サービス名
    ///
    /// subscriber には使わない。呼び出し元でルートスパンのフィールドに設定する。
    pub service_name: String,
    /// ログ出力形式
    pub log_format:   LogFormat,
    /// ログ出力先
    pub log_output:   LogOutput,
}

impl TracingConfig {
    /// 新しい設定を作成する（出力先はコンソール）
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
            log_output: LogOutput::Console,
        }
    }

    /// 環境変数から設定を読み取る
    ///
    /// `LOG_FORMAT` で出力形式を、`LOG_FILE` で出力先を決定する。
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env()).with_output(LogOutput::from_env())
    }

    /// 出力先を差し替える
    pub fn with_output(mut self, log_output: LogOutput) -> Self {
        self.log_output = log_output;
        self
    }
}

/// トレーシングを初期化する
///
/// `RUST_LOG` 環境変数でログレベルを制御可能。
/// 未設定の場合は `"info,axum_utils=debug"` をデフォルトとする。
///
/// ログファイルを開けない場合、またはグローバル subscriber が
/// 既に設定されている場合はエラーを返す。
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    use tracing_subscriber::{
        Layer as _,
        fmt::writer::BoxMakeWriter,
        layer::SubscriberExt,
        util::SubscriberInitExt,
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let (writer, ansi) = match &config.log_output {
        LogOutput::Console => (BoxMakeWriter::new(std::io::stderr), true),
        LogOutput::File(path) => (BoxMakeWriter::new(Arc::new(open_log_file(path)?)), false),
    };

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::TracingInit(e.to_string()))
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// UUID v7 で Request ID を生成する
///
/// `SetRequestIdLayer::x_request_id(MakeRequestUuidV7)` として使用する。
/// クライアントが `X-Request-Id` を送ってきた場合はそちらが優先される。
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::now_v7().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// `TraceLayer::make_span_with` 用のスパンを生成する
///
/// `method`, `uri`, `request_id` をスパンフィールドとして持つため、
/// スパン内で出力されたログにはこれらが自動的に付与される。
pub fn make_request_span<B>(request: &Request<B>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    // ===== LogFormat::parse テスト =====

    #[test]
    fn test_parse_jsonでjsonを返す() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
    }

    #[test]
    fn test_parse_prettyでprettyを返す() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
    }

    #[test]
    fn test_parse_不正な値でprettyにフォールバックする() {
        assert_eq!(LogFormat::parse("unknown"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Pretty);
    }

    // ===== LogOutput::parse テスト =====

    #[test]
    fn test_log_output_未設定でconsoleを返す() {
        assert_eq!(LogOutput::parse(None), LogOutput::Console);
        assert_eq!(LogOutput::parse(Some("  ")), LogOutput::Console);
    }

    #[test]
    fn test_log_output_パス指定でfileを返す() {
        assert_eq!(
            LogOutput::parse(Some("/tmp/console-or-file.log")),
            LogOutput::File(PathBuf::from("/tmp/console-or-file.log"))
        );
    }

    // ===== TracingConfig テスト =====

    #[test]
    fn test_newでフィールドが正しく設定される() {
        let config = TracingConfig::new("template", LogFormat::Json);

        assert_eq!(config.service_name, "template");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_output, LogOutput::Console);
    }

    #[test]
    fn test_from_envでサービス名が保持される() {
        let config = TracingConfig::from_env("template");

        assert_eq!(config.service_name, "template");
    }

    #[test]
    fn test_init_tracing_ログファイルを開けない場合はエラーを返す() {
        let config = TracingConfig::new("template", LogFormat::Pretty)
            .with_output(LogOutput::File(PathBuf::from("/nonexistent-dir/app.log")));

        let result = init_tracing(config);

        assert!(matches!(result, Err(Error::LogFile { .. })));
    }

    // ===== Request ID テスト =====

    #[test]
    fn test_make_request_uuid_v7がuuid_v7を生成する() {
        let request = Request::builder().uri("/ping").body(()).unwrap();

        let id = MakeRequestUuidV7.make_request_id(&request).unwrap();
        let uuid = Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();

        assert_eq!(uuid.get_version(), Some(uuid::Version::SortRand));
    }
}
