//! OpenAI 兼容托管 API Provider
//!
//! 请求体使用 async_openai 的 chat-completion 类型构造，经 reqwest 发往 `{base_url}/chat/completions`，
//! 回复取 `choices[0].message.content`。不走 async_openai::Client：它会对 429 自动退避重试，
//! 而这里需要把限流原样交给调用方。
//!
//! 错误映射：401 / 403 → Unauthorized；429 → RateLimited；其余非 2xx → RemoteRejected；
//! 传输层同 Ollama（连接失败 / 超时 → Unavailable，其他 → Unknown）。

use std::time::Duration;

use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::core::{ProviderError, SmartBotError};
use crate::llm::traits::{assistant_reply, outbound_messages};
use crate::llm::{LlmProvider, SamplingOptions};
use crate::memory::{Message, Role};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o";

/// 托管 API 客户端：持有 HTTP Client、凭据与模型名
#[derive(Debug)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    options: SamplingOptions,
}

impl OpenAiProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: SecretString,
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
            api_key,
            options,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_openai_messages(
        messages: &[&Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, ProviderError> {
        messages
            .iter()
            .map(|m| {
                let content = m.content().to_string();
                let built = match m.role() {
                    Role::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(content)
                        .build()
                        .map(ChatCompletionRequestMessage::System),
                    Role::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(content)
                        .build()
                        .map(ChatCompletionRequestMessage::User),
                    Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                        .content(content)
                        .build()
                        .map(ChatCompletionRequestMessage::Assistant),
                };
                built.map_err(|e| ProviderError::Unknown(format!("failed to build request: {e}")))
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// 错误体为 `{"error": {"message": ...}}` 时取 message，否则用原文
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Unauthorized(error_message(&body))
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(error_message(&body)),
        _ => ProviderError::RemoteRejected {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate_response(
        &self,
        prompt: &Message,
        history: &[Message],
    ) -> Result<Message, ProviderError> {
        let messages = Self::to_openai_messages(&outbound_messages(prompt, history))?;
        tracing::debug!(model = %self.model, messages = messages.len(), "sending chat completion");

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.options.temperature)
            .top_p(self.options.top_p)
            .build()
            .map_err(|e| ProviderError::Unknown(format!("failed to build request: {e}")))?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ProviderError::from_transport)?;
        if !status.is_success() {
            tracing::warn!(status = %status, "hosted API rejected request");
            return Err(classify_status(status, body));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::BadResponse(format!("invalid JSON body: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ProviderError::BadResponse("missing choices[0].message.content".to_string())
            })?;

        assistant_reply(content)
    }

    /// GET /models 返回 2xx 视为可用（同时验证凭据）
    async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "hosted API health check failed");
                false
            }
        }
    }
}
