//! # ログ出力のリダイレクト
//!
//! `io::Write` に書き込まれたテキストを行単位で tracing イベントに変換する。
//!
//! フレームワークや依存クレートの中には、構造化ログを経由せず
//! 直接ライターや stderr に書き出すものがある。[`LogWriter`] をその出力先に
//! 差し込むことで、起動時メッセージなどの低レベルな出力も tracing に集約できる。
//!
//! ```rust,ignore
//! use std::io::Write;
//! use axum_utils::LogWriter;
//! use tracing::Level;
//!
//! let mut writer = LogWriter::new(Level::INFO);
//! writeln!(writer, "listening on 0.0.0.0:8080")?;
//! ```

use std::{
    fmt,
    io::{self, Write},
    panic::PanicHookInfo,
};

use tracing::Level;

/// `source` フィールドのデフォルト値
const DEFAULT_SOURCE: &str = "axum";

/// 改行が来なくてもこのサイズに達したら 1 行として出力する
const MAX_LINE_BYTES: usize = 64 * 1024;

/// 行単位で tracing イベントを出力する `io::Write` 実装
///
/// 改行までをバッファに溜め、1 行 = 1 イベントとして指定レベルで出力する。
/// 末尾の `\r` は取り除き、空行は出力しない。
/// 改行で終わらない残りは [`flush`](Write::flush) またはドロップ時に出力される。
/// 改行のないまま 64 KiB に達した場合はその時点で 1 行として出力する。
pub struct LogWriter {
    level:  Level,
    source: &'static str,
    buffer: Vec<u8>,
}

impl LogWriter {
    /// 指定レベルで出力するライターを作成する
    pub fn new(level: Level) -> Self {
        Self {
            level,
            source: DEFAULT_SOURCE,
            buffer: Vec::new(),
        }
    }

    /// イベントの `source` フィールドを差し替える
    pub fn with_source(mut self, source: &'static str) -> Self {
        self.source = source;
        self
    }

    /// 出力レベル
    pub fn level(&self) -> Level {
        self.level
    }

    fn emit_line(&self, line: &[u8]) {
        let text = String::from_utf8_lossy(line);
        let text = text.trim_end_matches('\r');
        if text.trim().is_empty() {
            return;
        }
        emit(self.level, self.source, text);
    }
}

impl fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogWriter")
            .field("level", &self.level)
            .field("source", &self.source)
            .field("pending", &self.buffer.len())
            .finish()
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // 既存のバッファには改行が含まれないため、追加分だけを走査する
        let mut scanned = self.buffer.len();
        self.buffer.extend_from_slice(buf);
        while let Some(offset) = self.buffer[scanned..].iter().position(|b| *b == b'\n') {
            let pos = scanned + offset;
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.emit_line(&line[..pos]);
            scanned = 0;
        }

        if self.buffer.len() >= MAX_LINE_BYTES {
            let rest = std::mem::take(&mut self.buffer);
            self.emit_line(&rest);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.emit_line(&rest);
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

// tracing のマクロはレベルを定数で受け取るため、実行時の値で分岐する
fn emit(level: Level, source: &str, text: &str) {
    if level == Level::ERROR {
        tracing::error!(source, "{text}");
    } else if level == Level::WARN {
        tracing::warn!(source, "{text}");
    } else if level == Level::INFO {
        tracing::info!(source, "{text}");
    } else if level == Level::DEBUG {
        tracing::debug!(source, "{text}");
    } else {
        tracing::trace!(source, "{text}");
    }
}

/// panic メッセージを ERROR レベルの tracing イベントとして出力する
///
/// デフォルトの panic フックは stderr に直接書き出すため、
/// JSON ログやファイル出力を使っていると panic だけが別経路に漏れる。
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let mut writer = LogWriter::new(Level::ERROR).with_source("panic");
        let _ = writeln!(writer, "{}", describe_panic(info));
    }));
}

fn describe_panic(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("Box<dyn Any>");

    match info.location() {
        Some(location) => format!("panicked at {location}: {message}"),
        None => format!("panicked: {message}"),
    }
}
