//! LLM 层：Provider 抽象与实现（Echo / Ollama 本地服务 / OpenAI 兼容托管 API）

pub mod echo;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use echo::EchoProvider;
pub use ollama::{OllamaProvider, DEFAULT_REQUEST_TIMEOUT, OLLAMA_BASE_URL, OLLAMA_DEFAULT_MODEL};
pub use openai::{OpenAiProvider, OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL};
pub use traits::{outbound_messages, LlmProvider, SamplingOptions};
