//! 事件模型
//!
//! 定义奖励代理处理的事件信封、奖励决策、转账请求以及代理身份。
//! 事件信封来自外部平台或内置模拟流，不强制任何 schema，
//! 缺失字段通过显式的默认值解析链补齐。

use std::borrow::Cow;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::config::AgentConfig;

/// 事件类型缺失时的默认值
pub const UNKNOWN_EVENT: &str = "unknown_event";
/// 接收者缺失时的默认值
pub const UNKNOWN_USER: &str = "unknown_user";

// ---------------------------------------------------------------------------
// EventEnvelope — 松散结构的事件信封
// ---------------------------------------------------------------------------

/// 事件信封
///
/// 所有字段均为可选，未识别的字段保留在 `extra` 中。
/// 空字符串与缺失等价，与上游平台的判空方式一致。
/// `type`/`name`/`user` 不限定 JSON 类型：数字和 `true` 转为文本，
/// `0`、`false`、`null`、数组与对象视为缺失，信封本身总能解析。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventEnvelope {
    /// 构建带类型与用户的事件，payload 为空对象
    pub fn new(event_type: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            user: Some(user.into()),
            payload: Some(Value::Object(Map::new())),
            ..Default::default()
        }
    }

    /// 解析事件类型：`type` -> `name` -> `"unknown_event"`
    pub fn resolve_event_type(&self) -> &str {
        non_empty(self.event_type.as_deref())
            .or_else(|| non_empty(self.name.as_deref()))
            .unwrap_or(UNKNOWN_EVENT)
    }

    /// 解析奖励接收者：`user` -> 调用方兜底用户 -> `payload.user` -> `"unknown_user"`
    ///
    /// 顺序固定，兜底用户优先于 payload 中的用户。
    pub fn resolve_recipient<'a>(&'a self, fallback_user: Option<&'a str>) -> Cow<'a, str> {
        non_empty(self.user.as_deref())
            .or_else(|| non_empty(fallback_user))
            .map(Cow::Borrowed)
            .or_else(|| self.payload_user())
            .unwrap_or(Cow::Borrowed(UNKNOWN_USER))
    }

    fn payload_user(&self) -> Option<Cow<'_, str>> {
        match self.payload.as_ref()?.get("user")? {
            Value::String(user) => non_empty(Some(user.as_str())).map(Cow::Borrowed),
            other => scalar_text(other).map(Cow::Owned),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// 把 JSON 标量转为文本，假值与复合值返回 `None`
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text))
}

// ---------------------------------------------------------------------------
// RewardDecision — 规则评估结果
// ---------------------------------------------------------------------------

/// 奖励决策
///
/// 每次评估新建，不可变，不持久化。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDecision {
    pub should_reward: bool,
    pub reason: Option<String>,
    pub amount: Option<u64>,
}

impl RewardDecision {
    /// 不发放奖励
    pub fn no_reward() -> Self {
        Self::default()
    }

    /// 发放指定数量的奖励
    pub fn reward(amount: u64, reason: impl Into<String>) -> Self {
        Self {
            should_reward: true,
            reason: Some(reason.into()),
            amount: Some(amount),
        }
    }

    /// 奖励标记、非零数量、非空原因三者同时成立才发放
    pub fn qualifies(&self) -> bool {
        self.should_reward
            && self.amount.is_some_and(|amount| amount != 0)
            && self.reason.as_deref().is_some_and(|reason| !reason.is_empty())
    }
}

// ---------------------------------------------------------------------------
// TransferRequest — 发送给转账能力的请求
// ---------------------------------------------------------------------------

/// 代币转账请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub to: String,
    pub amount: u64,
    pub token: String,
    pub memo: String,
}

// ---------------------------------------------------------------------------
// AgentIdentity — 代理静态身份
// ---------------------------------------------------------------------------

/// 代理身份
///
/// 启动时构建一次，之后以只读引用共享给各组件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentIdentity {
    pub name: String,
    pub description: String,
    pub wallet: String,
    pub token: String,
}

impl From<&AgentConfig> for AgentIdentity {
    fn from(config: &AgentConfig) -> Self {
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            wallet: config.wallet.clone(),
            token: config.token.clone(),
        }
    }
}

impl Default for AgentIdentity {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}
