//! `dashboard_models` 公共模型库 crate。
//!
//! 本 crate 集中定义了葡萄酒数据看板的统计服务端与其客户端之间共享的线路数据结构：
//! - **通用枚举 (`enums`)**: 协议动作代码 `MessageAction`，在线路上以整数表示并严格校验。
//! - **WebSocket 消息负载 (`ws_payloads`)**: 请求解码 `ActionRequest`、各动作的响应结构体、
//!   错误帧 `ErrorResponsePayload` 以及数据集行记录 `RowRecord`。
//!
//! 所有线路结构均实现 `serde` 的序列化/反序列化，字段命名与看板前端保持一致。

pub mod enums; // 协议动作代码
pub mod ws_payloads; // 请求与响应负载

pub use enums::{MessageAction, UnknownActionCode};
pub use ws_payloads::{
    ActionRequest, DatasetResponse, ErrorResponsePayload, MeansResponse, RequestDecodeError, RowRecord,
};
