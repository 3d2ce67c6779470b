//! # HTTP ハンドラユーティリティ
//!
//! 既存のハンドラを axum のハンドラとして再利用するための変換と、
//! 簡易レスポンスの生成、汎用ハンドラを提供する。
//!
//! ## モジュール構成
//!
//! ```text
//! handler.rs          # 親モジュール（re-export）
//! └── handler/
//!     ├── adapter.rs  # tower Service / 同期関数 → axum ハンドラ
//!     ├── wrapper.rs  # CanServe + Options（CORS）→ axum ハンドラ
//!     ├── result.rs   # JSON / プレーンテキストのエラーレスポンス
//!     ├── page.rs     # 簡易 HTML ページ
//!     └── utility.rs  # ping / exit / link / health_check
//! ```
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use axum_utils::handler::{self, adapt_fn};
//!
//! let app = Router::new()
//!     .route("/ping", get(handler::ping))
//!     .route("/legacy", get(adapt_fn(legacy_page)));
//! ```

use std::{future::Future, pin::Pin};

use axum::response::Response;

pub mod adapter;
pub mod page;
pub mod result;
pub mod utility;
pub mod wrapper;

pub use adapter::{adapt, adapt_fn};
pub use page::{LINK_TABLE_STYLE_SHEET, LinkDef, centered_page, centered_text, links};
pub use result::{error_result, json_result};
pub use utility::{exit, health_check, link, ping};
pub use wrapper::{CanServe, Options, Wrapper};

/// 変換後のハンドラが返す Future
pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;
