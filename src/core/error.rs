//! 错误类型
//!
//! SmartBotError 覆盖输入校验、配置、存储、Provider 调用与取消；ProviderError 按失败原因分类，
//! Agent 不捕获、不降级，原样上抛给调用方决定重试 / 提示用户 / 放弃。

use std::path::PathBuf;

use thiserror::Error;

/// 核心对外暴露的错误
#[derive(Error, Debug)]
pub enum SmartBotError {
    /// 非法消息或构造参数（未知角色、空白内容）
    #[error("Validation error: {0}")]
    Validation(String),

    /// 非法配置（窗口大小 < 1、温度越界、缺少 API Key 等）
    #[error("Config error: {0}")]
    Config(String),

    /// 持久化文件读写失败。内存中的历史可能已经包含本次追加（不回滚）
    #[error("Storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// 调用方在模型返回前取消了请求；用户消息已写入记忆
    #[error("Request cancelled")]
    Cancelled,
}

impl SmartBotError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Provider 失败原因（不含消息体，便于调用方 match 后决定策略）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Unavailable,
    RemoteRejected,
    BadResponse,
    Unauthorized,
    RateLimited,
    Unknown,
}

/// Provider 调用失败
#[derive(Error, Debug)]
pub enum ProviderError {
    /// 连接被拒绝 / 不可达 / 超时
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// 非 2xx 响应（除鉴权与限流外）
    #[error("Remote rejected request (HTTP {status}): {body}")]
    RemoteRejected { status: u16, body: String },

    /// 响应体无法解析或缺少期望字段
    #[error("Bad response: {0}")]
    BadResponse(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Unavailable(_) => ProviderErrorKind::Unavailable,
            Self::RemoteRejected { .. } => ProviderErrorKind::RemoteRejected,
            Self::BadResponse(_) => ProviderErrorKind::BadResponse,
            Self::Unauthorized(_) => ProviderErrorKind::Unauthorized,
            Self::RateLimited(_) => ProviderErrorKind::RateLimited,
            Self::Unknown(_) => ProviderErrorKind::Unknown,
        }
    }

    /// 把 reqwest 传输层错误归类：连不上或超时视为不可用，其余一律 Unknown
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Unknown(err.to_string())
        }
    }
}
