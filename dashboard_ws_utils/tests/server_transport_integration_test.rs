// dashboard_ws_utils/tests/server_transport_integration_test.rs

use dashboard_ws_utils::client::transport::connect_client;
use dashboard_ws_utils::message::receive_text;
use dashboard_ws_utils::server::transport::{ConnectionHandler, ServerTransport, WsReceiver};
use log::{info, LevelFilter};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;

// 辅助函数：初始化日志，仅用于测试，避免多次初始化
fn init_test_logger() {
    let _ = env_logger::builder().filter_level(LevelFilter::Info).is_test(true).try_init();
}

// on_connect 回调：把收到的每条文本加上前缀回显，直到对端关闭
async fn echo_handler(mut handler: ConnectionHandler, mut receiver: WsReceiver) {
    let peer_addr = handler.peer_addr();
    info!("[Test Server] 新的 WebSocket 连接来自 {}", peer_addr);
    while let Some(Ok(text)) = receive_text(&mut receiver).await {
        if handler.send(Message::Text(format!("Server received: {}", text))).await.is_err() {
            break;
        }
    }
    info!("[Test Server] 与 {} 的连接处理结束", peer_addr);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_accepts_connection_and_echoes() {
    init_test_logger();

    let transport = ServerTransport::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
    let addr = transport.local_addr();
    let (stop_tx, stop_rx) = watch::channel(false);
    let server_handle = tokio::spawn(transport.serve(echo_handler, stop_rx));

    let mut client = connect_client(&format!("ws://{}", addr)).await.expect("客户端连接失败");
    client.send_text("Hello from client!").await.expect("客户端发送消息失败");

    let reply = timeout(Duration::from_secs(5), client.receive_text())
        .await
        .expect("等待回显超时")
        .expect("连接意外关闭")
        .expect("接收回显失败");
    assert_eq!(reply, "Server received: Hello from client!");

    client.close().await.expect("关闭客户端失败");
    let _ = stop_tx.send(true);
    timeout(Duration::from_secs(5), server_handle)
        .await
        .expect("服务器未在停止信号后退出")
        .expect("服务器任务 panic")
        .expect("服务器返回错误");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
/// 停止信号之后监听器被释放，新的连接被拒绝，已有连接继续可用。
async fn test_stop_signal_closes_listener_but_keeps_existing_connections() {
    init_test_logger();

    let transport = ServerTransport::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
    let addr = transport.local_addr();
    let url = format!("ws://{}", addr);
    let (stop_tx, stop_rx) = watch::channel(false);
    let server_handle = tokio::spawn(transport.serve(echo_handler, stop_rx));

    let mut existing = connect_client(&url).await.expect("停止前的连接应成功");

    stop_tx.send(true).expect("发送停止信号失败");
    timeout(Duration::from_secs(5), server_handle)
        .await
        .expect("服务器未在停止信号后退出")
        .expect("服务器任务 panic")
        .expect("服务器返回错误");

    assert!(connect_client(&url).await.is_err(), "停止后的新连接应被拒绝");

    existing.send_text("still here").await.expect("已有连接发送失败");
    let reply = timeout(Duration::from_secs(5), existing.receive_text())
        .await
        .expect("等待回显超时")
        .expect("已有连接意外关闭")
        .expect("接收回显失败");
    assert_eq!(reply, "Server received: still here");
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    init_test_logger();

    let first = ServerTransport::bind("127.0.0.1:0").await.expect("无法绑定到随机端口");
    let taken = first.local_addr().to_string();
    match ServerTransport::bind(&taken).await {
        Err(dashboard_ws_utils::error::WsError::TcpBindError { addr, .. }) => assert_eq!(addr, taken),
        Err(other) => panic!("预期 TcpBindError，实际: {}", other),
        Ok(_) => panic!("重复绑定同一端口不应成功"),
    }
}
