//! 记忆后端抽象
//!
//! 所有后端（内存 / JSON 文件）实现 MemoryBackend。方法取 `&mut self`：一个后端只属于一个 Agent，
//! 同一会话不允许并发调用；多会话请各自持有 Agent + Memory。

use crate::core::SmartBotError;
use crate::memory::{Message, Role};

/// 对话历史存储
pub trait MemoryBackend: Send {
    /// 校验并追加一条消息。校验失败时不产生任何副作用
    fn add_message(&mut self, role: Role, content: &str) -> Result<(), SmartBotError>;

    /// 按时间顺序（最旧在前）返回历史的独立副本
    fn get_history(&self) -> Vec<Message>;

    /// 清空历史；文件后端同时删除文件，文件不存在不算错误
    fn clear(&mut self) -> Result<(), SmartBotError>;
}
