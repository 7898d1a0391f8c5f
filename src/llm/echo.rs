//! Echo Provider（离线、确定性，用作空对象与测试替身）
//!
//! 原样返回本轮用户消息内容作为 assistant 回复，不读取历史。

use async_trait::async_trait;

use crate::core::ProviderError;
use crate::llm::traits::assistant_reply;
use crate::llm::LlmProvider;
use crate::memory::Message;

#[derive(Debug, Default, Clone, Copy)]
pub struct EchoProvider;

#[async_trait]
impl LlmProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate_response(
        &self,
        prompt: &Message,
        _history: &[Message],
    ) -> Result<Message, ProviderError> {
        assistant_reply(prompt.content())
    }
}
