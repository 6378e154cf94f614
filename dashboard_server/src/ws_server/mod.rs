//! WebSocket 服务端逻辑模块。

pub mod client_session;
pub mod connection_manager;
pub mod message_router;
pub mod service;
