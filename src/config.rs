//! 应用配置：从 config/default.{toml,yaml}、指定文件与环境变量加载
//!
//! 加载顺序：先读 config/default（若存在），再读调用方指定的文件（TOML 或 YAML，按扩展名识别），
//! 最后用环境变量 `SMARTBOT__*` 覆盖（双下划线表示嵌套，如 `SMARTBOT__LLM__PROVIDER=ollama`）。
//! 这里只做形状与取值范围检查；核心类型（Agent / Memory / Provider）不读取配置。

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::core::SmartBotError;
use crate::llm::{
    SamplingOptions, OLLAMA_BASE_URL, OLLAMA_DEFAULT_MODEL, OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL,
};
use crate::memory::{DEFAULT_CONTEXT_WINDOW, DEFAULT_HISTORY_FILE};

/// 配置根
#[derive(Debug, Deserialize)]
pub struct ChatBotConfig {
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub memory: MemorySection,
}

fn default_bot_name() -> String {
    "SmartBot".to_string()
}

impl Default for ChatBotConfig {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            llm: LlmSection::default(),
            memory: MemorySection::default(),
        }
    }
}

/// [llm] 段：按 provider 字段区分后端
#[derive(Debug, Default, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmSection {
    #[default]
    Echo,
    Ollama(OllamaSection),
    Openai(OpenAiSection),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OllamaSection {
    pub base_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub top_p: f32,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for OllamaSection {
    fn default() -> Self {
        Self {
            base_url: OLLAMA_BASE_URL.to_string(),
            model_name: OLLAMA_DEFAULT_MODEL.to_string(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OllamaSection {
    pub fn sampling(&self) -> SamplingOptions {
        SamplingOptions {
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OpenAiSection {
    /// 未配置时回退到环境变量 OPENAI_API_KEY
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl Default for OpenAiSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OPENAI_BASE_URL.to_string(),
            model_name: OPENAI_DEFAULT_MODEL.to_string(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OpenAiSection {
    pub fn sampling(&self) -> SamplingOptions {
        SamplingOptions {
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 配置中的 api_key 优先，其次 OPENAI_API_KEY
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        self.api_key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_string()))
            .or_else(|| {
                std::env::var("OPENAI_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty())
                    .map(SecretString::from)
            })
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|k| !k.trim().is_empty()).map(SecretString::from))
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    1.0
}

fn default_timeout_secs() -> u64 {
    60
}

/// 记忆后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    InMemory,
    JsonFile,
}

/// [memory] 段：后端、文件路径、滑动窗口大小
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub backend: MemoryKind,
    pub file_path: PathBuf,
    pub max_messages: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            backend: MemoryKind::JsonFile,
            file_path: PathBuf::from(DEFAULT_HISTORY_FILE),
            max_messages: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

impl ChatBotConfig {
    /// 形状与取值范围检查：温度 / top_p ∈ [0, 1]，窗口 ≥ 1，超时 > 0，openai 必须有 API Key
    pub fn validate(&self) -> Result<(), SmartBotError> {
        if self.memory.max_messages < 1 {
            return Err(SmartBotError::Config(
                "memory.max_messages must be at least 1".to_string(),
            ));
        }
        match &self.llm {
            LlmSection::Echo => Ok(()),
            LlmSection::Ollama(s) => {
                check_sampling(s.temperature, s.top_p)?;
                check_timeout(s.timeout_secs)
            }
            LlmSection::Openai(s) => {
                check_sampling(s.temperature, s.top_p)?;
                check_timeout(s.timeout_secs)?;
                if s.resolve_api_key().is_none() {
                    return Err(SmartBotError::Config(
                        "llm.api_key (or OPENAI_API_KEY) is required for the openai provider"
                            .to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn check_sampling(temperature: f32, top_p: f32) -> Result<(), SmartBotError> {
    if !(0.0..=1.0).contains(&temperature) {
        return Err(SmartBotError::Config(format!(
            "llm.temperature must be within [0, 1], got {temperature}"
        )));
    }
    if !(0.0..=1.0).contains(&top_p) {
        return Err(SmartBotError::Config(format!(
            "llm.top_p must be within [0, 1], got {top_p}"
        )));
    }
    Ok(())
}

fn check_timeout(timeout_secs: u64) -> Result<(), SmartBotError> {
    if timeout_secs == 0 {
        return Err(SmartBotError::Config(
            "llm.timeout_secs must be positive".to_string(),
        ));
    }
    Ok(())
}

/// 加载并校验配置
///
/// 1. config/default.{toml,yaml}（可选）
/// 2. config_path 指定的文件（指定了就必须存在）
/// 3. 环境变量 SMARTBOT__*
pub fn load_config(config_path: Option<&Path>) -> Result<ChatBotConfig, SmartBotError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false));

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SMARTBOT")
            .separator("__")
            .try_parsing(true),
    );

    let cfg: ChatBotConfig = builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| SmartBotError::Config(e.to_string()))?;
    cfg.validate()?;

    tracing::debug!(bot = %cfg.bot_name, "configuration loaded");
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    /// 环境变量是进程级共享的：调用 load_config 的测试串行执行
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config_is_valid() {
        let cfg = ChatBotConfig::default();
        assert!(matches!(cfg.llm, LlmSection::Echo));
        assert_eq!(cfg.memory.max_messages, DEFAULT_CONTEXT_WINDOW);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_load_yaml_ollama() {
        let _env = env_guard();
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bot.yaml",
            "bot_name: Tester\nllm:\n  provider: ollama\n  model_name: llama3\n  top_p: 0.9\nmemory:\n  backend: in_memory\n",
        );

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.bot_name, "Tester");
        assert_eq!(cfg.memory.backend, MemoryKind::InMemory);
        match cfg.llm {
            LlmSection::Ollama(s) => {
                assert_eq!(s.model_name, "llama3");
                assert_eq!(s.base_url, OLLAMA_BASE_URL);
                assert!((s.top_p - 0.9).abs() < 1e-6);
                assert!((s.temperature - 0.7).abs() < 1e-6);
            }
            other => panic!("Expected ollama section, got {other:?}"),
        }
    }

    #[test]
    fn test_load_toml_openai_with_key() {
        let _env = env_guard();
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bot.toml",
            "[llm]\nprovider = \"openai\"\napi_key = \"sk-test\"\nmodel_name = \"gpt-4o-mini\"\n\n[memory]\nfile_path = \"data/history.json\"\nmax_messages = 4\n",
        );

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.memory.max_messages, 4);
        assert_eq!(cfg.memory.file_path, PathBuf::from("data/history.json"));
        match &cfg.llm {
            LlmSection::Openai(s) => {
                assert_eq!(s.model_name, "gpt-4o-mini");
                assert_eq!(s.resolve_api_key().unwrap().expose_secret(), "sk-test");
            }
            other => panic!("Expected openai section, got {other:?}"),
        }
        // 调试输出不泄露密钥
        assert!(!format!("{cfg:?}").contains("sk-test"));
    }

    #[test]
    fn test_temperature_out_of_range() {
        let _env = env_guard();
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bot.yaml",
            "llm:\n  provider: ollama\n  temperature: 1.5\n",
        );
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, SmartBotError::Config(_)));
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_zero_window_rejected() {
        let _env = env_guard();
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bot.yaml", "memory:\n  max_messages: 0\n");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, SmartBotError::Config(_)));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let _env = env_guard();
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bot.yaml", "llm:\n  provider: telepathy\n");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, SmartBotError::Config(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let _env = env_guard();
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bot.yaml",
            "llm:\n  provider: echo\nmemory:\n  max_messages: 5\n",
        );

        std::env::set_var("SMARTBOT__LLM__PROVIDER", "ollama");
        std::env::set_var("SMARTBOT__LLM__MODEL_NAME", "phi3");
        std::env::set_var("SMARTBOT__MEMORY__MAX_MESSAGES", "7");
        let result = load_config(Some(&path));
        std::env::remove_var("SMARTBOT__LLM__PROVIDER");
        std::env::remove_var("SMARTBOT__LLM__MODEL_NAME");
        std::env::remove_var("SMARTBOT__MEMORY__MAX_MESSAGES");

        let cfg = result.unwrap();
        assert_eq!(cfg.memory.max_messages, 7);
        match cfg.llm {
            LlmSection::Ollama(s) => {
                assert_eq!(s.model_name, "phi3");
                assert_eq!(s.base_url, OLLAMA_BASE_URL);
            }
            other => panic!("Expected ollama section, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_explicit_file() {
        let _env = env_guard();
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, SmartBotError::Config(_)));
    }
}
