//! JSON 文件记忆：滑动窗口 + 整文件覆盖写
//!
//! - 构造时加载文件；文件不存在 → 空历史；内容无法解析或校验失败 → 记日志并重置为空（fail-open）
//! - 每次 add_message：校验 → 追加 → 从头部剪枝到 max_messages → 原子写盘（临时文件 + rename）
//! - 写盘失败返回 Storage，但内存中的追加不回滚：调用方应理解为「已接受，未保证落盘」

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::SmartBotError;
use crate::memory::{MemoryBackend, Message, Role};

pub const DEFAULT_HISTORY_FILE: &str = "conversation_history.json";
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

#[derive(Debug)]
pub struct JsonFileMemory {
    path: PathBuf,
    max_messages: usize,
    messages: Vec<Message>,
}

impl JsonFileMemory {
    /// max_messages 必须 ≥ 1；文件读失败（非 NotFound）返回 Storage
    pub fn new(path: impl AsRef<Path>, max_messages: usize) -> Result<Self, SmartBotError> {
        if max_messages < 1 {
            return Err(SmartBotError::Config(
                "max_messages must be at least 1".to_string(),
            ));
        }
        let path = path.as_ref().to_path_buf();
        let messages = load_history(&path)?;
        Ok(Self {
            path,
            max_messages,
            messages,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// 超出窗口时丢弃最旧的消息
    fn prune(&mut self) {
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(..excess);
        }
    }

    /// 序列化到完整缓冲区，写入同目录临时文件后 rename 覆盖；父目录不存在时自动创建
    fn save(&self) -> Result<(), SmartBotError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.write_failed(e))?;
        }
        let json = serde_json::to_vec_pretty(&self.messages)
            .map_err(|e| self.write_failed(e.into()))?;

        // 任一步失败都删掉临时文件，原文件保持不变
        let tmp_path = self.tmp_path();
        if let Err(e) = std::fs::write(&tmp_path, json)
            .and_then(|()| std::fs::rename(&tmp_path, &self.path))
        {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(self.write_failed(e));
        }
        tracing::debug!(
            path = %self.path.display(),
            count = self.messages.len(),
            "history saved"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_failed(&self, err: std::io::Error) -> SmartBotError {
        tracing::error!(path = %self.path.display(), error = %err, "failed to save history");
        SmartBotError::storage(&self.path, err)
    }
}

impl MemoryBackend for JsonFileMemory {
    fn add_message(&mut self, role: Role, content: &str) -> Result<(), SmartBotError> {
        let msg = Message::new(role, content)?;
        self.messages.push(msg);
        self.prune();
        self.save()
    }

    /// 只返回最近 max_messages 条（外部进程可能写入了更长的文件）
    fn get_history(&self) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(self.max_messages);
        self.messages[start..].to_vec()
    }

    fn clear(&mut self) -> Result<(), SmartBotError> {
        self.messages.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "memory cleared and file deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "failed to delete memory file");
                Err(SmartBotError::storage(&self.path, e))
            }
        }
    }
}

/// 读取历史文件：不存在 → 空；损坏 → 警告后为空
fn load_history(path: &Path) -> Result<Vec<Message>, SmartBotError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "memory file not found, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(SmartBotError::storage(path, e)),
    };

    match serde_json::from_slice::<Vec<Message>>(&data) {
        Ok(messages) => {
            tracing::debug!(path = %path.display(), count = messages.len(), "history loaded");
            Ok(messages)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt memory file, resetting history");
            Ok(Vec::new())
        }
    }
}
