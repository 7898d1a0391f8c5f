//! SmartBot - 对话编排核心
//!
//! 模块划分：
//! - **agent**: Agent 编排器（写入用户消息 → 读历史 → 调用 Provider → 写入回复）
//! - **config**: 应用配置加载（TOML / YAML + 环境变量）
//! - **core**: 错误类型
//! - **llm**: Provider 抽象与实现（Echo / Ollama / OpenAI 兼容）
//! - **memory**: 消息模型与记忆后端（内存 / JSON 文件滑动窗口）
//! - **observability**: tracing 订阅者初始化

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;

pub use agent::{build_agent, Agent};
