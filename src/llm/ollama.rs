//! 本地模型服务 Provider（Ollama `/api/chat` 协议）
//!
//! 非流式：请求体 `{model, messages, stream: false, options: {temperature, top_p}}`，
//! 回复取响应体 `message.content`。请求受固定超时约束。
//!
//! 错误映射：连接失败 / 超时 → Unavailable；非 2xx → RemoteRejected；
//! 响应体缺字段或非 JSON → BadResponse；其余传输错误 → Unknown。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{ProviderError, SmartBotError};
use crate::llm::traits::{assistant_reply, outbound_messages};
use crate::llm::{LlmProvider, SamplingOptions};
use crate::memory::{Message, WireMessage};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.2:1b";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    options: SamplingOptions,
}

impl OllamaProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        options: SamplingOptions,
        timeout: Duration,
    ) -> Result<Self, SmartBotError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SmartBotError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            options,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate_response(
        &self,
        prompt: &Message,
        history: &[Message],
    ) -> Result<Message, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: outbound_messages(prompt, history)
                .into_iter()
                .map(Message::to_wire)
                .collect(),
            stream: false,
            options: ChatOptions {
                temperature: self.options.temperature,
                top_p: self.options.top_p,
            },
        };
        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            "sending chat request to local model server"
        );

        let response = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ProviderError::from_transport)?;
        if !status.is_success() {
            tracing::warn!(status = %status, "local model server rejected request");
            return Err(ProviderError::RemoteRejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::BadResponse(format!("invalid JSON body: {e}")))?;
        let content = parsed
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| ProviderError::BadResponse("missing message.content".to_string()))?;

        assistant_reply(content)
    }

    /// GET /api/tags 返回 2xx 视为可用
    async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "local model server health check failed");
                false
            }
        }
    }
}
