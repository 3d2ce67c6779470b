//! # 簡易 HTML ページ
//!
//! デモやテンプレート用の最小限の HTML を生成する。
//! 引数の文字列はそのまま埋め込まれる（エスケープしない）ため、
//! ユーザー入力を渡さないこと。

use std::fmt::Write as _;

use axum::response::Html;

const HTML_CENTERED_TEXT: &str = "
<head><title>[TITLE]</title></head>
<body><center>[TEXT]</center></body>
";

/// [`links`] のデフォルトスタイルシート
pub const LINK_TABLE_STYLE_SHEET: &str = "
    table.links {
      border-collapse: collapse;
      margin-left: auto;
      margin-right: auto;
    }

    table.links td.link {
        text-align: right;
    }

    table.links td.description {
        font-style: italic;
    }

    table.links td.spacer {
        width: 1em;
    }
";

/// リンク一覧ページの 1 行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDef {
    pub path:        String,
    pub name:        String,
    pub description: String,
}

impl LinkDef {
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path:        path.into(),
            name:        name.into(),
            description: description.into(),
        }
    }
}

/// タイトルと中央寄せテキストだけの HTML を返す
pub fn centered_text(title: &str, text: &str) -> String {
    HTML_CENTERED_TEXT
        .replacen("[TITLE]", title, 1)
        .replacen("[TEXT]", text, 1)
}

/// [`centered_text`] を HTML レスポンスとして返す
pub fn centered_page(title: &str, text: &str) -> Html<String> {
    Html(centered_text(title, text))
}

/// リンク一覧の HTML ページを返す
///
/// `style_sheet` が空文字の場合は [`LINK_TABLE_STYLE_SHEET`] を使用する。
/// ハンドラとして登録する場合はクロージャで包むこと:
///
/// ```rust,ignore
/// .route("/links", get(|| async {
///     links("", &[LinkDef::new("/ping", "Ping", "server existence")])
/// }))
/// ```
pub fn links(style_sheet: &str, links: &[LinkDef]) -> Html<String> {
    let style_sheet = if style_sheet.is_empty() {
        LINK_TABLE_STYLE_SHEET
    } else {
        style_sheet
    };

    let mut page = String::new();
    page.push_str("<head>\n  <title>Links</title>\n");
    page.push_str("  <style>\n");
    page.push_str(style_sheet);
    page.push_str("  </style>\n");
    page.push_str("</head>\n<body>\n");
    page.push_str("  <table class=\"links\">\n");
    for link in links {
        let _ = writeln!(
            page,
            "<tr><td class=\"link\"><a href=\"{}\">{}</a></td>\
             <td class=\"spacer\"></td>\
             <td class=\"description\">{}</td></tr>",
            link.path, link.name, link.description
        );
    }
    page.push_str("  </table>\n</body>\n");

    Html(page)
}
