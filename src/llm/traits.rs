//! Provider 抽象
//!
//! 所有后端（Echo / Ollama 本地服务 / OpenAI 兼容托管 API）实现 LlmProvider：
//! 给定本轮用户消息与（已被记忆窗口截断的）历史，返回一条 assistant 消息。
//! Provider 内部不重试；失败以 ProviderError 返回。

use async_trait::async_trait;

use crate::core::ProviderError;
use crate::memory::Message;

/// 采样参数（取值范围由配置层保证在 [0, 1]）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// 后端名称，用于日志
    fn name(&self) -> &str;

    /// 生成回复；返回的消息 role 总是 Assistant
    async fn generate_response(
        &self,
        prompt: &Message,
        history: &[Message],
    ) -> Result<Message, ProviderError>;

    /// 连通性检查，不返回错误；默认认为可用
    async fn health_check(&self) -> bool {
        true
    }
}

/// 组装发给模型的消息序列：历史 + 本轮 prompt。
/// Agent 会先把 prompt 写入记忆再取历史，此时历史末尾已是 prompt，不重复追加。
pub fn outbound_messages<'a>(prompt: &'a Message, history: &'a [Message]) -> Vec<&'a Message> {
    let mut messages: Vec<&Message> = history.iter().collect();
    if history.last() != Some(prompt) {
        messages.push(prompt);
    }
    messages
}

/// 把模型返回的文本包装为 assistant 消息；空白回复视为坏响应
pub(crate) fn assistant_reply(content: impl Into<String>) -> Result<Message, ProviderError> {
    Message::assistant(content)
        .map_err(|_| ProviderError::BadResponse("empty assistant reply".to_string()))
}
