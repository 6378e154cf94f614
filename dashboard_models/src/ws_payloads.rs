// dashboard_models/src/ws_payloads.rs

//! 包含 WebSocket 通信中使用的请求与响应负载定义。
//!
//! 请求帧统一为 `{"action": <int>, "content": <payload>}`，
//! 响应帧的字段随动作不同而不同，见各响应结构体。

use crate::enums::{MessageAction, UnknownActionCode};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// 错误帧中 `error` 字段的取值：请求格式错误。
pub const MALFORMED_REQUEST_ERROR: &str = "MalformedRequest";
/// 错误帧中 `error` 字段的取值：行索引越界。
pub const INVALID_INDEX_ERROR: &str = "InvalidIndex";
/// 错误帧中 `error` 字段的取值：服务端正在关闭。
pub const SHUTDOWN_IN_PROGRESS_ERROR: &str = "ShutdownInProgress";
/// 错误帧中 `error` 字段的取值：其他内部错误。
pub const INTERNAL_ERROR: &str = "InternalError";

/// 解码请求帧失败的原因。
#[derive(Error, Debug)]
pub enum RequestDecodeError {
    /// 帧内容不是合法的 JSON，或缺少 `action` 字段，或 `action` 不是整数。
    #[error("请求帧不是合法的请求结构: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    /// `action` 是整数，但不在协议表中。
    #[error(transparent)]
    UnknownAction(#[from] UnknownActionCode),

    /// 动作合法，但 `content` 无法解析为该动作需要的结构。
    #[error("动作 {action} 的 content 无法解析: {source}")]
    InvalidContent {
        action: MessageAction,
        #[source]
        source: serde_json::Error,
    },
}

impl RequestDecodeError {
    /// 若已经识别出动作代码，则返回它，供错误帧回显。
    pub fn action(&self) -> Option<MessageAction> {
        match self {
            RequestDecodeError::InvalidContent { action, .. } => Some(*action),
            _ => None,
        }
    }
}

/// 原始请求信封；`action` 先按整数读取，再单独映射到 `MessageAction`，
/// 以便区分“不是整数”和“未知代码”两种错误。
#[derive(Deserialize, Debug)]
struct RequestEnvelope {
    action: i64,
    #[serde(default)]
    content: Value,
}

/// 选中均值请求的 `content`。
///
/// 同时接受裸数组 `[0, 2]` 和看板前端发送的 `{"indices": [0, 2]}`。
/// 索引按有符号整数解析，负数由处理函数作为越界索引拒绝。
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SelectionContent {
    Indices(Vec<i64>),
    Wrapped { indices: Vec<i64> },
}

impl SelectionContent {
    pub fn into_indices(self) -> Vec<i64> {
        match self {
            SelectionContent::Indices(indices) | SelectionContent::Wrapped { indices } => indices,
        }
    }
}

/// 一次解码成功的请求。
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    /// 序列化数据集；`content` 被忽略。
    PassData,
    /// 选中行的归一化均值；空索引表示全部行。
    PassSelectionMeans { indices: Vec<i64> },
    /// 全部行的归一化均值；`content` 被忽略。
    PassOverallMeans,
}

impl ActionRequest {
    /// 从一条文本帧解码请求。
    pub fn decode(text: &str) -> Result<Self, RequestDecodeError> {
        let envelope: RequestEnvelope =
            serde_json::from_str(text).map_err(RequestDecodeError::InvalidEnvelope)?;
        let action = MessageAction::from_code(envelope.action)?;
        match action {
            MessageAction::PassData => Ok(ActionRequest::PassData),
            MessageAction::PassOverallMeans => Ok(ActionRequest::PassOverallMeans),
            MessageAction::PassSelectionMeans => {
                let content: SelectionContent = serde_json::from_value(envelope.content)
                    .map_err(|source| RequestDecodeError::InvalidContent { action, source })?;
                Ok(ActionRequest::PassSelectionMeans {
                    indices: content.into_indices(),
                })
            }
        }
    }

    /// 请求对应的动作。
    pub fn action(&self) -> MessageAction {
        match self {
            ActionRequest::PassData => MessageAction::PassData,
            ActionRequest::PassSelectionMeans { .. } => MessageAction::PassSelectionMeans,
            ActionRequest::PassOverallMeans => MessageAction::PassOverallMeans,
        }
    }
}

/// `serialize-dataset` 的响应。
///
/// `content` 是行记录数组的 JSON 字符串，看板前端会对它再调用一次 `JSON.parse`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasetResponse {
    pub action: MessageAction,
    pub content: String,
    pub feature_names: Vec<String>,
    pub class_names: Vec<String>,
}

/// `selection-means` 与 `overall-means` 的响应。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MeansResponse {
    pub action: MessageAction,
    /// 每个特征一个值的归一化均值向量。
    pub means: Vec<f64>,
    /// 参与计算的行数。
    pub count: usize,
}

/// 处理失败时代替正常响应发送的错误帧。
///
/// 该结构刻意不包含 `action` 字段，按 `action` 分派的客户端会直接忽略它。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponsePayload {
    /// 错误种类，取值见本模块的 `*_ERROR` 常量。
    pub error: String,
    /// 可读的错误描述。
    pub message: String,
    /// 若能识别，回显原请求的动作代码。
    pub request_action: Option<MessageAction>,
}

/// 数据集中一行的记录视图，序列化为以列名为键的 JSON 对象。
///
/// 列的顺序为：全部特征列，`label`（若该行带有类别标签），然后是各个辅助列。
#[derive(Debug, Clone, Copy)]
pub struct RowRecord<'a> {
    pub feature_names: &'a [String],
    pub features: &'a [f64],
    pub label: Option<usize>,
    pub auxiliary_names: &'a [String],
    pub auxiliary: &'a [f64],
}

/// 行记录中类别标签所在的列名。
pub const LABEL_COLUMN: &str = "label";

impl Serialize for RowRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.features.len() + usize::from(self.label.is_some()) + self.auxiliary.len();
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in self.feature_names.iter().zip(self.features) {
            map.serialize_entry(name, value)?;
        }
        if let Some(label) = self.label {
            map.serialize_entry(LABEL_COLUMN, &label)?;
        }
        for (name, value) in self.auxiliary_names.iter().zip(self.auxiliary) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
