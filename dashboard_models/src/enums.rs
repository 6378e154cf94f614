//! 通用枚举模块。
//!
//! 本模块定义了看板客户端与统计服务端之间共享的枚举类型，目前只有协议中的动作代码
//! `MessageAction`。动作代码在线路上以整数表示，其取值由协议固定，
//! 解码时必须严格校验，未知代码一律视为格式错误的请求。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// 请求中携带了协议未定义的动作代码时返回的错误。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("未知的动作代码: {0}")]
pub struct UnknownActionCode(pub i64);

/// 协议中的三种动作。
///
/// 请求帧的 `action` 字段决定服务端执行哪一个统计处理函数，
/// 响应帧的 `action` 字段回显同一个代码，客户端据此区分响应类型。
///
/// | 代码 | 动作 |
/// |---|---|
/// | 0 | `PassData`：序列化整个数据集 |
/// | 1 | `PassSelectionMeans`：选中行的归一化均值 |
/// | 2 | `PassOverallMeans`：全部行的归一化均值 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageAction {
    /// 序列化数据集（行记录、特征名、类别名）。
    PassData,
    /// 计算一组行索引的归一化均值。
    PassSelectionMeans,
    /// 计算全部行的归一化均值。
    PassOverallMeans,
}

impl MessageAction {
    /// 协议定义的全部动作，按代码升序排列。
    pub const ALL: [MessageAction; 3] = [
        MessageAction::PassData,
        MessageAction::PassSelectionMeans,
        MessageAction::PassOverallMeans,
    ];

    /// 返回该动作在线路上的整数代码。
    pub const fn code(self) -> u8 {
        match self {
            MessageAction::PassData => 0,
            MessageAction::PassSelectionMeans => 1,
            MessageAction::PassOverallMeans => 2,
        }
    }

    /// 从线路上的整数代码解析动作。
    pub fn from_code(code: i64) -> Result<Self, UnknownActionCode> {
        match code {
            0 => Ok(MessageAction::PassData),
            1 => Ok(MessageAction::PassSelectionMeans),
            2 => Ok(MessageAction::PassOverallMeans),
            other => Err(UnknownActionCode(other)),
        }
    }

    /// 日志中使用的可读名称。
    pub const fn name(self) -> &'static str {
        match self {
            MessageAction::PassData => "serialize-dataset",
            MessageAction::PassSelectionMeans => "selection-means",
            MessageAction::PassOverallMeans => "overall-means",
        }
    }
}

impl TryFrom<i64> for MessageAction {
    type Error = UnknownActionCode;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        MessageAction::from_code(code)
    }
}

impl fmt::Display for MessageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

// 线路格式是纯整数，因此手写 Serialize/Deserialize 而不是派生（派生会输出变体名字符串）。
impl Serialize for MessageAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for MessageAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        MessageAction::from_code(code).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 每个动作的代码都能解析回同一个动作。
    fn test_action_codes_match_protocol_table() {
        assert_eq!(MessageAction::PassData.code(), 0);
        assert_eq!(MessageAction::PassSelectionMeans.code(), 1);
        assert_eq!(MessageAction::PassOverallMeans.code(), 2);
        for action in MessageAction::ALL {
            assert_eq!(MessageAction::from_code(i64::from(action.code())), Ok(action));
        }
    }

    #[test]
    /// 未知代码（包括负数）必须被拒绝。
    fn test_unknown_codes_are_rejected() {
        assert_eq!(MessageAction::from_code(3), Err(UnknownActionCode(3)));
        assert_eq!(MessageAction::from_code(-1), Err(UnknownActionCode(-1)));
        assert!(MessageAction::try_from(42).is_err());
    }

    #[test]
    /// 动作在 JSON 中表示为裸整数。
    fn test_action_serializes_as_integer() {
        let json = serde_json::to_string(&MessageAction::PassOverallMeans).expect("序列化动作失败");
        assert_eq!(json, "2");

        let parsed: MessageAction = serde_json::from_str("1").expect("反序列化动作失败");
        assert_eq!(parsed, MessageAction::PassSelectionMeans);

        assert!(serde_json::from_str::<MessageAction>("7").is_err(), "未知代码不应被反序列化");
        assert!(serde_json::from_str::<MessageAction>("\"PassData\"").is_err(), "字符串形式不属于协议");
    }

    #[test]
    fn test_action_display_contains_name_and_code() {
        assert_eq!(MessageAction::PassSelectionMeans.to_string(), "selection-means(1)");
    }
}
