//! # Graceful shutdown
//!
//! OS の割り込みシグナル（SIGINT / SIGTERM）を受けて、処理中のリクエストの
//! 完了を待ってからサーバーを停止する。
//!
//! ## 状態遷移
//!
//! ```text
//! initialize ──▶ serve（待機中）──▶ close（停止処理中）──▶ closed
//!                   ▲
//!      SIGINT / SIGTERM / interrupt() で待機が解除される
//! ```
//!
//! ## 使用例
//!
//! ```rust,ignore
//! let mut graceful = Graceful::initialize()?;
//!
//! let router = Router::new().route("/ping", get(handler::ping));
//! graceful.serve(router, 8080).await?;
//!
//! // ここに来た時点でシグナルを受信済み
//! graceful.close().await;
//! ```
//!
//! `close()` を呼ばずに `Graceful` をドロップした場合も、サーバーへの停止要求は
//! 送られる（ただし完了は待たない）。

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use tokio::{
    net::TcpListener,
    sync::{oneshot, watch},
    task::JoinHandle,
};

use crate::error::{Error, Result};

/// 停止要求からサーバー停止までの猶予時間
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// `close()` 以降にシグナルを受けたときの終了コード（128 + SIGINT）
const FORCE_EXIT_CODE: i32 = 130;

/// 待機中のサーバーに停止を要求するハンドル
///
/// `Graceful::serve` が `&mut self` を借用している間でも、
/// ハンドラなど別のタスクから停止を要求できる。
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl InterruptHandle {
    fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            stop: Arc::new(stop),
        }
    }

    /// 停止を要求する（シグナル受信と同じ扱い）
    pub fn interrupt(&self) {
        self.stop.send_replace(true);
    }

    /// 停止が要求済みか
    pub fn is_interrupted(&self) -> bool {
        *self.stop.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }
}

/// SIGINT / SIGTERM の受信待ち
#[cfg(unix)]
struct SignalListener {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    fn register() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).map_err(Error::SignalHandler)?,
            terminate: signal(SignalKind::terminate()).map_err(Error::SignalHandler)?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

/// Ctrl+C の受信待ち（unix 以外）
#[cfg(not(unix))]
struct SignalListener;

#[cfg(not(unix))]
impl SignalListener {
    fn register() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        let _ = tokio::signal::ctrl_c().await;
        "CTRL_C"
    }
}

/// バックグラウンドで稼働中のサーバー
struct RunningServer {
    local_addr: SocketAddr,
    shutdown:   Option<oneshot::Sender<()>>,
    task:       JoinHandle<io::Result<()>>,
}

impl RunningServer {
    fn request_shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// 停止を要求し、猶予時間まで完了を待つ
    async fn shutdown(mut self, grace_period: Duration) {
        self.request_shutdown();

        match tokio::time::timeout(grace_period, &mut self.task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => {
                tracing::error!(error = %err, "サーバーの停止中にエラーが発生しました");
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "サーバータスクが異常終了しました");
            }
            Err(_) => {
                tracing::error!(
                    grace_period_ms = grace_period.as_millis() as u64,
                    "猶予時間内に停止しなかったためサーバーを強制停止します"
                );
                self.task.abort();
            }
        }
    }
}

/// シグナル駆動の Graceful shutdown
pub struct Graceful {
    stop:         InterruptHandle,
    signal_task:  Option<JoinHandle<()>>,
    server:       Option<RunningServer>,
    grace_period: Duration,
    closed:       bool,
}

impl std::fmt::Debug for Graceful {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graceful")
            .field("interrupted", &self.stop.is_interrupted())
            .field("local_addr", &self.local_addr())
            .field("grace_period", &self.grace_period)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Graceful {
    /// シグナルハンドラを登録して初期化する
    ///
    /// tokio ランタイム内で呼び出すこと。
    /// 最初のシグナルで停止要求フラグが立ち、`serve` の待機が解除される。
    pub fn initialize() -> Result<Self> {
        let mut listener = SignalListener::register()?;
        let stop = InterruptHandle::new();

        let handle = stop.clone();
        let signal_task = tokio::spawn(async move {
            let signal = listener.recv().await;
            tracing::info!(signal, "シグナルを受信しました");
            handle.interrupt();
        });

        Ok(Self {
            stop,
            signal_task: Some(signal_task),
            server: None,
            grace_period: GRACE_PERIOD,
            closed: false,
        })
    }

    /// 猶予時間を変更する（デフォルト: [`GRACE_PERIOD`]）
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// 猶予時間
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// 別タスクから停止を要求するためのハンドル
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.stop.clone()
    }

    /// 停止を要求する
    pub fn interrupt(&self) {
        self.stop.interrupt();
    }

    /// 停止が要求済みか
    pub fn is_interrupted(&self) -> bool {
        self.stop.is_interrupted()
    }

    /// `close()` 済みか
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 稼働中のサーバーのアドレス
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|s| s.local_addr)
    }

    /// `0.0.0.0:port` でサーバーを起動し、停止要求まで待機する
    pub async fn serve(&mut self, router: Router, port: u16) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        self.serve_listener(router, listener).await
    }

    /// バインド済みのリスナーでサーバーを起動し、停止要求まで待機する
    ///
    /// サーバーはバックグラウンドタスクで動作し、このメソッドは
    /// 停止要求（シグナルまたは [`interrupt`](Self::interrupt)）を受けると `Ok(())` を返す。
    /// サーバーがそれより先に終了した場合はその結果を返す。
    ///
    /// サーバーは 1 つだけ起動できる。既に起動済みの場合は何もしない。
    pub async fn serve_listener(&mut self, router: Router, listener: TcpListener) -> Result<()> {
        if self.server.is_some() {
            tracing::warn!("サーバーは既に起動しています");
            return Ok(());
        }

        let local_addr = listener.local_addr().map_err(Error::Serve)?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        });
        tracing::info!(%local_addr, "サーバーを起動しました");

        let mut running = RunningServer {
            local_addr,
            shutdown: Some(shutdown_tx),
            task,
        };

        let mut stop = self.stop.subscribe();
        let finished = tokio::select! {
            _ = stop.wait_for(|stopped| *stopped) => None,
            joined = &mut running.task => Some(joined),
        };

        match finished {
            None => {
                self.server = Some(running);
                Ok(())
            }
            Some(Ok(Ok(()))) => Ok(()),
            Some(Ok(Err(err))) => {
                tracing::error!(error = %err, "サーバーが異常終了しました");
                Err(Error::Serve(err))
            }
            Some(Err(join_err)) => {
                tracing::error!(error = %join_err, "サーバータスクが異常終了しました");
                Err(Error::Serve(io::Error::other(join_err)))
            }
        }
    }

    /// サーバーを停止し、シグナルの捕捉を終了する
    ///
    /// 何度呼んでも停止処理は 1 回しか行わない。
    /// 停止処理中、および `close()` から戻った後にシグナルを受けた場合は
    /// 終了コード 130 でプロセスを終了する（シグナルのデフォルト動作と同等）。
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        // 監視タスクを先に登録し、シグナル捕捉が途切れないようにする
        spawn_force_exit_watcher();
        if let Some(task) = self.signal_task.take() {
            task.abort();
        }
        tracing::info!(
            "Graceful shutdown を開始します。強制終了するにはもう一度 Ctrl+C を押してください"
        );

        match self.server.take() {
            Some(server) => {
                server.shutdown(self.grace_period).await;
                tracing::info!("サーバーを停止しました");
            }
            None => tracing::warn!("Graceful::close() の時点でサーバーが存在しません"),
        }
    }
}

impl Drop for Graceful {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Some(task) = self.signal_task.take() {
            task.abort();
        }
        if let Some(mut server) = self.server.take() {
            server.request_shutdown();
        }
    }
}

/// `close()` 以降のシグナルでプロセスを終了させる監視タスク
///
/// ランタイムが終了するまで残り続ける。
fn spawn_force_exit_watcher() {
    let mut listener = match SignalListener::register() {
        Ok(listener) => listener,
        Err(err) => {
            tracing::warn!(error = %err, "強制終了用のシグナルハンドラを登録できませんでした");
            return;
        }
    };

    tokio::spawn(async move {
        let signal = listener.recv().await;
        tracing::warn!(signal, "停止処理中にシグナルを受信したため強制終了します");
        std::process::exit(FORCE_EXIT_CODE);
    });
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_initialize直後は未停止かつ未クローズ() {
        let graceful = Graceful::initialize().unwrap();

        assert!(!graceful.is_interrupted());
        assert!(!graceful.is_closed());
        assert_eq!(graceful.local_addr(), None);
        assert_eq!(graceful.grace_period(), GRACE_PERIOD);
    }

    #[tokio::test]
    async fn test_interrupt_handleから停止を要求できる() {
        let graceful = Graceful::initialize().unwrap();
        let handle = graceful.interrupt_handle();

        handle.interrupt();

        assert!(graceful.is_interrupted());
        assert!(handle.is_interrupted());
    }

    #[tokio::test]
    async fn test_closeは冪等である() {
        let mut graceful = Graceful::initialize().unwrap();

        graceful.close().await;
        assert!(graceful.is_closed());

        graceful.close().await;
        assert!(graceful.is_closed());
    }

    #[tokio::test]
    async fn test_with_grace_periodで猶予時間を変更できる() {
        let graceful = Graceful::initialize()
            .unwrap()
            .with_grace_period(Duration::from_millis(250));

        assert_eq!(graceful.grace_period(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_停止要求済みならserve_listenerは即座に戻る() {
        let mut graceful = Graceful::initialize().unwrap();
        graceful.interrupt();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let expected = listener.local_addr().unwrap();

        graceful
            .serve_listener(Router::new(), listener)
            .await
            .unwrap();

        assert_eq!(graceful.local_addr(), Some(expected));
        graceful.close().await;
        assert_eq!(graceful.local_addr(), None);
    }

    #[tokio::test]
    async fn test_使用中のポートではbindエラーを返す() {
        let occupied = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = occupied.local_addr().unwrap().port();
        let mut graceful = Graceful::initialize().unwrap();

        let result = graceful.serve(Router::new(), port).await;

        assert!(matches!(result, Err(Error::Bind { .. })));
    }
}
