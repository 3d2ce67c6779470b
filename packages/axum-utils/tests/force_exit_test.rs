//! # 強制終了のテスト
//!
//! `close()` 以降のシグナルでプロセスが終了コード 130 で終わることを検証する。
//! プロセス自体が終了するため、テストバイナリを子プロセスとして再実行し、
//! 子プロセス側でシナリオを実行して親プロセスで終了コードを確認する。

#![cfg(unix)]

use std::time::Duration;

use axum::{Router, routing::get};
use axum_utils::Graceful;
use nix::{
    sys::signal::{Signal, kill},
    unistd::Pid,
};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;

/// 子プロセスで実行するシナリオ名を渡す環境変数
const SCENARIO_ENV: &str = "AXUM_UTILS_FORCE_EXIT_SCENARIO";

/// 指定したテストだけを子プロセスで実行し、終了コードを返す
async fn run_in_child(test_name: &str, scenario: &str) -> Option<i32> {
    let status = tokio::process::Command::new(std::env::current_exe().unwrap())
        .args([test_name, "--exact", "--test-threads=1", "--nocapture"])
        .env(SCENARIO_ENV, scenario)
        .status()
        .await
        .unwrap();
    status.code()
}

fn scenario() -> Option<String> {
    std::env::var(SCENARIO_ENV).ok()
}

/// close() を終えた後に SIGINT を受ける
async fn signal_after_close() {
    let mut graceful = Graceful::initialize().unwrap();
    graceful.close().await;

    kill(Pid::this(), Signal::SIGINT).unwrap();

    // ここまでに終了していなければ親プロセス側で失敗になる
    tokio::time::sleep(Duration::from_secs(3)).await;
}

/// 処理中のリクエストを待っている close() の途中で SIGINT を受ける
async fn signal_during_close() {
    let mut graceful = Graceful::initialize()
        .unwrap()
        .with_grace_period(Duration::from_secs(10));
    let handle = graceful.interrupt_handle();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Router::new().route(
        "/stuck",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "too late"
        }),
    );
    let server = tokio::spawn(async move {
        let result = graceful.serve_listener(router, listener).await;
        (graceful, result)
    });

    tokio::spawn(reqwest::get(format!("http://{addr}/stuck")));
    tokio::time::sleep(Duration::from_millis(300)).await;

    handle.interrupt();
    let (mut graceful, result) = server.await.unwrap();
    result.unwrap();

    tokio::spawn(async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        kill(Pid::this(), Signal::SIGINT).unwrap();
    });

    // 猶予時間（10 秒）より先にシグナルで終了するはず
    graceful.close().await;
}

#[tokio::test]
async fn test_close後のシグナルで終了コード130で終了する() {
    if scenario().as_deref() == Some("after_close") {
        signal_after_close().await;
        return;
    }

    let code = run_in_child("test_close後のシグナルで終了コード130で終了する", "after_close").await;

    assert_eq!(code, Some(130));
}

#[tokio::test]
async fn test_停止処理中のシグナルで終了コード130で終了する() {
    if scenario().as_deref() == Some("during_close") {
        signal_during_close().await;
        return;
    }

    let code = run_in_child("test_停止処理中のシグナルで終了コード130で終了する", "during_close").await;

    assert_eq!(code, Some(130));
}
