//! 错误类型
//!
//! 流程层统一使用 `anyhow::Result`，这里只定义调用方需要分支判断的错误。
//! 元素找不到不是错误，查找函数返回 `Option`。

use thiserror::Error;

/// 配置错误，任何一种都会让程序直接退出
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件格式错误 {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("配置项 {key} 无效: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("浏览器配置失败: {0}")]
    Configuration(String),

    #[error("浏览器启动失败（已重试 {attempts} 次）: {last_error}")]
    LaunchExhausted { attempts: u32, last_error: String },

    #[error("标签页 {0} 已不存在")]
    TabGone(String),
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("未配置 {provider} 的 API Key")]
    MissingApiKey { provider: &'static str },

    #[error("LLM API 调用失败 (模型: {model}): {message}")]
    RequestFailed { model: String, message: String },

    #[error("LLM 返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 应用程序结果类型
pub type Result<T> = anyhow::Result<T>;
