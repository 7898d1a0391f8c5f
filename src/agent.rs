//! Agent 编排器
//!
//! 组合一个 Memory 与一个 Provider，定义单次请求的生命周期：
//! 1. 校验并写入用户消息（失败立即返回，不调用模型）
//! 2. 读取历史（已包含刚写入的用户消息）
//! 3. 调用 Provider；错误原样上抛，不重试
//! 4. 写入 assistant 回复
//! 5. 返回回复文本
//!
//! 成功后历史恰好增加两条（user、assistant）；第 3 步失败或被取消时只增加用户消息。
//! 一个 Agent 同一时间只服务一个调用方（`&mut self`）；并发会话请各自创建 Agent。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{ChatBotConfig, LlmSection, MemoryKind};
use crate::core::SmartBotError;
use crate::llm::{EchoProvider, LlmProvider, OllamaProvider, OpenAiProvider};
use crate::memory::{InMemoryBackend, JsonFileMemory, MemoryBackend, Message, Role};

pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    memory: Box<dyn MemoryBackend>,
}

impl Agent {
    pub fn new(provider: Arc<dyn LlmProvider>, memory: Box<dyn MemoryBackend>) -> Self {
        Self { provider, memory }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// 只读访问记忆（取历史快照等）
    pub fn memory(&self) -> &dyn MemoryBackend {
        self.memory.as_ref()
    }

    /// 处理一条用户消息并返回 assistant 回复
    pub async fn handle_message(&mut self, user_input: &str) -> Result<String, SmartBotError> {
        self.handle_message_with_cancel(user_input, CancellationToken::new())
            .await
    }

    /// 同 handle_message，但模型调用可被 cancel_token 中断；
    /// 中断时返回 Cancelled，记忆中保留用户消息、不写入回复
    pub async fn handle_message_with_cancel(
        &mut self,
        user_input: &str,
        cancel_token: CancellationToken,
    ) -> Result<String, SmartBotError> {
        tracing::debug!(provider = self.provider.name(), "handling message from user");

        self.memory.add_message(Role::User, user_input)?;

        let history = self.memory.get_history();
        tracing::debug!(history_len = history.len(), "history loaded");

        // 历史末尾就是刚写入的用户消息；取不到时（理论上不会）按原文重建
        let prompt = match history.last() {
            Some(last) if last.role() == Role::User && last.content() == user_input => last.clone(),
            _ => Message::user(user_input)?,
        };

        let reply = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                tracing::info!("request cancelled before provider replied");
                return Err(SmartBotError::Cancelled);
            }
            result = self.provider.generate_response(&prompt, &history) => result?,
        };
        tracing::debug!("generated response");

        self.memory.add_message(Role::Assistant, reply.content())?;

        Ok(reply.content().to_string())
    }

    /// 清空对话记忆
    pub fn clear(&mut self) -> Result<(), SmartBotError> {
        self.memory.clear()
    }
}

/// 根据已校验的配置选择 Provider 与 Memory 后端并创建 Agent
pub fn build_agent(cfg: &ChatBotConfig) -> Result<Agent, SmartBotError> {
    cfg.validate()?;

    let provider: Arc<dyn LlmProvider> = match &cfg.llm {
        LlmSection::Echo => {
            tracing::info!("Using echo provider");
            Arc::new(EchoProvider)
        }
        LlmSection::Ollama(s) => {
            tracing::info!("Using Ollama provider ({} at {})", s.model_name, s.base_url);
            Arc::new(OllamaProvider::new(
                &s.base_url,
                &s.model_name,
                s.sampling(),
                s.timeout(),
            )?)
        }
        LlmSection::Openai(s) => {
            let api_key = s.resolve_api_key().ok_or_else(|| {
                SmartBotError::Config("missing API key for the openai provider".to_string())
            })?;
            tracing::info!("Using OpenAI provider ({})", s.model_name);
            Arc::new(OpenAiProvider::new(
                &s.base_url,
                &s.model_name,
                api_key,
                s.sampling(),
                s.timeout(),
            )?)
        }
    };

    let memory: Box<dyn MemoryBackend> = match cfg.memory.backend {
        MemoryKind::InMemory => Box::new(InMemoryBackend::new()),
        MemoryKind::JsonFile => Box::new(JsonFileMemory::new(
            &cfg.memory.file_path,
            cfg.memory.max_messages,
        )?),
    };

    Ok(Agent::new(provider, memory))
}
