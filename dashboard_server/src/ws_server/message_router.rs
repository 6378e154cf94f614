//! 负责单个连接的读循环，以及把每个请求派发到工作池。
//!
//! 读循环只做解码和派发：每解码出一个请求就启动一个独立的处理任务，随即返回去读下一帧，
//! 从不等待计算完成。处理任务把计算提交给工作池，拿到结果后经会话的发送队列写回同一连接。
//! 因此同一连接上的响应顺序不保证与请求顺序一致。

use crate::error::AppError;
use crate::handlers::handle_action;
use crate::state::ServerState;
use crate::ws_server::client_session::ClientSession;
use dashboard_models::ws_payloads::MALFORMED_REQUEST_ERROR;
use dashboard_models::{ActionRequest, ErrorResponsePayload, MessageAction};
use dashboard_ws_utils::error::WsError;
use dashboard_ws_utils::message::receive_text;
use dashboard_ws_utils::server::transport::{ConnectionHandler, WsReceiver};
use futures_util::FutureExt;
use log::{debug, error, info, warn};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;

/// 每个连接发送队列的容量
const OUTBOUND_QUEUE_CAPACITY: usize = 32;

/// 处理一个已完成握手的连接，直到它关闭。
pub async fn handle_connection(state: Arc<ServerState>, handler: ConnectionHandler, mut receiver: WsReceiver) {
    let (tx_to_client, rx_from_session) = mpsc::channel::<Message>(OUTBOUND_QUEUE_CAPACITY);
    let session = state.connections.add_client(handler.peer_addr(), tx_to_client);
    let client_id = session.client_id;

    let sender_task = tokio::spawn(run_sender(handler, rx_from_session, client_id.to_string()));

    loop {
        match receive_text(&mut receiver).await {
            Some(Ok(text)) => dispatch_frame(&state, &session, text),
            Some(Err(WsError::DeserializationError(message))) => {
                // 单帧无法解码不影响连接
                warn!("[分发器] 会话 {}: 帧解码失败: {}", client_id, message);
                let payload = ErrorResponsePayload {
                    error: MALFORMED_REQUEST_ERROR.to_string(),
                    message,
                    request_action: None,
                };
                spawn_error_reply(&state, &session, payload);
            }
            Some(Err(e)) => {
                error!("[分发器] 会话 {}: 读循环发生意外错误，终止连接: {}", client_id, e);
                break;
            }
            None => {
                info!("[分发器] 会话 {}: 客户端关闭了连接。", client_id);
                break;
            }
        }
    }

    // 仍在运行的处理任务各自持有会话；它们全部结束后发送队列关闭，发送任务随之退出
    drop(session);
    state.connections.remove_client(&client_id);
    if let Err(e) = sender_task.await {
        error!("[分发器] 会话 {}: 发送任务异常结束: {:?}", client_id, e);
    }
    debug!("[分发器] 会话 {}: 连接处理已全部结束。", client_id);
}

/// 发送任务：独占连接的发送半部，按入队顺序写出帧。
async fn run_sender(mut handler: ConnectionHandler, mut rx: mpsc::Receiver<Message>, client_id: String) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = handler.send(frame).await {
            warn!("[发送任务 {}] 向客户端写出帧失败，连接可能已断开: {}", client_id, e);
            break;
        }
    }
    handler.close().await;
    debug!("[发送任务 {}] 已结束。", client_id);
}

/// 解码一帧并派发。解码失败时回复错误帧，连接继续可用。
fn dispatch_frame(state: &Arc<ServerState>, session: &Arc<ClientSession>, text: String) {
    match ActionRequest::decode(&text) {
        Ok(request) => {
            debug!("[分发器] 会话 {}: 收到请求 {}", session.client_id, request.action());
            spawn_handoff(state, session, request);
        }
        Err(e) => {
            warn!("[分发器] 会话 {}: 请求格式错误: {}。原始帧: '{}'", session.client_id, e, text);
            let request_action = e.action();
            let error = AppError::MalformedRequest(e);
            spawn_error_reply(state, session, error_payload(&error, request_action));
        }
    }
}

/// 启动一个处理任务。读循环不等待它结束。
fn spawn_handoff(state: &Arc<ServerState>, session: &Arc<ClientSession>, request: ActionRequest) {
    // 登记在启动任务之前完成，关闭流程不会漏掉刚派发的请求
    let in_flight = state.handoffs.enter();
    let state = Arc::clone(state);
    let session = Arc::clone(session);

    tokio::spawn(async move {
        let _in_flight = in_flight;
        let action = request.action();

        let result = match AssertUnwindSafe(process_request(&state, request)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(AppError::WorkerFailure(panic_message(panic.as_ref()))),
        };

        match result {
            Ok(text) => {
                if !session.send_text(text).await {
                    warn!("[分发器] 会话 {}: 连接已关闭，丢弃 {} 的响应。", session.client_id, action);
                }
            }
            Err(e) => {
                warn!("[分发器] 会话 {}: 处理 {} 失败: {}", session.client_id, action, e);
                send_error(&session, &error_payload(&e, Some(action))).await;
            }
        }
    });
}

/// 把计算提交给工作池并等待其结果。
async fn process_request(state: &ServerState, request: ActionRequest) -> Result<String, AppError> {
    let dataset = Arc::clone(&state.dataset);
    state.pool.submit(move || handle_action(&dataset, &request)).await?
}

fn spawn_error_reply(state: &Arc<ServerState>, session: &Arc<ClientSession>, payload: ErrorResponsePayload) {
    let in_flight = state.handoffs.enter();
    let session = Arc::clone(session);
    tokio::spawn(async move {
        let _in_flight = in_flight;
        send_error(&session, &payload).await;
    });
}

fn error_payload(error: &AppError, request_action: Option<MessageAction>) -> ErrorResponsePayload {
    ErrorResponsePayload {
        error: error.kind().to_string(),
        message: error.to_string(),
        request_action,
    }
}

async fn send_error(session: &ClientSession, payload: &ErrorResponsePayload) {
    match session.send_json(payload).await {
        Ok(true) => {}
        Ok(false) => debug!("[分发器] 会话 {}: 连接已关闭，错误帧未发送。", session.client_id),
        Err(e) => error!("[分发器] 会话 {}: 序列化错误帧失败: {}", session.client_id, e),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("处理任务 panic: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("处理任务 panic: {}", message)
    } else {
        "处理任务 panic".to_string()
    }
}
