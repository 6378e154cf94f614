// dashboard_ws_utils/src/server/mod.rs

//! WebSocket 服务端模块。
//!
//! 负责在指定地址上监听、完成握手，并把每个连接的读写两个半部交给上层回调；
//! 上层通过一个 `watch` 停止信号控制监听循环何时退出。

pub mod transport; // 服务端传输层：ServerTransport 与 ConnectionHandler
