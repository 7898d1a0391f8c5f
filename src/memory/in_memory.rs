//! 内存记忆：进程内 Vec，无容量上限
//!
//! 生命周期与对象一致，适合临时会话与测试。

use crate::core::SmartBotError;
use crate::memory::{MemoryBackend, Message, Role};

#[derive(Clone, Debug, Default)]
pub struct InMemoryBackend {
    messages: Vec<Message>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl MemoryBackend for InMemoryBackend {
    fn add_message(&mut self, role: Role, content: &str) -> Result<(), SmartBotError> {
        let msg = Message::new(role, content)?;
        self.messages.push(msg);
        Ok(())
    }

    fn get_history(&self) -> Vec<Message> {
        self.messages.clone()
    }

    fn clear(&mut self) -> Result<(), SmartBotError> {
        self.messages.clear();
        Ok(())
    }
}
