//! `dashboard_server` 服务端核心库。
//!
//! 通过 WebSocket 向葡萄酒数据看板提供统计数据：数据集序列化、选中行的归一化均值
//! 以及全部行的归一化均值。计算在有界工作池中执行，连接的读循环从不阻塞。
//!
//! 主要模块包括：
//! - `config`: 配置文件的加载与保存。
//! - `dataset`: 只读数据集及其加载。
//! - `handlers`: 三个动作的统计计算。
//! - `worker_pool`: 执行计算任务的有界工作池。
//! - `ws_server`: 连接接收、会话管理与消息分发。
//! - `shutdown`: 终止信号与关闭流程。
//! - `server`: 把以上组件组装成可运行的服务。

pub mod activity;
pub mod config;
pub mod dataset;
pub mod error;
pub mod handlers;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod worker_pool;
pub mod ws_server;
