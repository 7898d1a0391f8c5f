//! 消息与角色
//!
//! Message 构造即校验（内容去空白后不可为空），之后不可变。
//! 持久化形态含 role / content / timestamp 三个字段；发给模型的只有 role / content（见 WireMessage）。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::SmartBotError;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SmartBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(SmartBotError::Validation(format!(
                "unknown role '{other}' (expected user, assistant or system)"
            ))),
        }
    }
}

/// 单条消息（不可变；字段只读）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMessage")]
pub struct Message {
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// 以当前时间创建消息；content 去空白后为空则返回 Validation
    pub fn new(role: Role, content: impl Into<String>) -> Result<Self, SmartBotError> {
        Self::with_timestamp(role, content, Utc::now())
    }

    pub fn with_timestamp(
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, SmartBotError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(SmartBotError::Validation(format!(
                "{role} message content must not be blank"
            )));
        }
        Ok(Self {
            role,
            content,
            timestamp,
        })
    }

    pub fn user(content: impl Into<String>) -> Result<Self, SmartBotError> {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Result<Self, SmartBotError> {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Result<Self, SmartBotError> {
        Self::new(Role::System, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// 发送给模型的两字段形态
    pub fn to_wire(&self) -> WireMessage<'_> {
        WireMessage {
            role: self.role,
            content: &self.content,
        }
    }
}

/// 对话内容的传输形态：只有 role + content，不带时间戳
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WireMessage<'a> {
    pub role: Role,
    pub content: &'a str,
}

/// 反序列化中间形态：读盘后经 Message 的校验再转换，保证文件里的空内容被视为损坏
#[derive(Deserialize)]
struct RawMessage {
    role: Role,
    content: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    timestamp: DateTime<Utc>,
}

/// 时间戳兼容两种 ISO-8601 写法：带时区（RFC 3339）与不带时区（按 UTC 处理）
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
}

impl TryFrom<RawMessage> for Message {
    type Error = SmartBotError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        Message::with_timestamp(raw.role, raw.content, raw.timestamp)
    }
}
