//! 可观测性
//!
//! 核心组件只发 tracing 事件，不持有全局 logger；由宿主程序在启动时安装订阅者。
//! 默认级别 info，可通过 RUST_LOG 覆盖（如 `RUST_LOG=smartbot=debug`）。

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 安装全局订阅者；已安装时返回错误而不是 panic
pub fn try_init() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer())
        .try_init()
}

/// 安装全局订阅者，重复调用只记一条警告
pub fn init() {
    if let Err(e) = try_init() {
        tracing::warn!("tracing subscriber already installed: {}", e);
    }
}
