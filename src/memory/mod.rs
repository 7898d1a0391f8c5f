//! 记忆层：消息模型、后端抽象、内存实现与 JSON 文件持久化

pub mod conversation;
pub mod in_memory;
pub mod persistence;
pub mod traits;

pub use conversation::{Message, Role, WireMessage};
pub use in_memory::InMemoryBackend;
pub use persistence::{JsonFileMemory, DEFAULT_CONTEXT_WINDOW, DEFAULT_HISTORY_FILE};
pub use traits::MemoryBackend;
