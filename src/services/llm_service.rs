//! LLM 服务 - 业务能力层
//!
//! 只负责"向 LLM 发一条消息并拿回文本"，不关心题目和流程
//!
//! ## 技术栈
//! - OpenAI 兼容接口（OpenAI / Kimi / DeepSeek 等）使用 `async-openai`
//! - 智谱 GLM 使用 `reqwest` 直接调用 chat/completions

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AiConfig, AiProvider};
use crate::error::LlmError;

/// 答题请求的温度
const ANSWER_TEMPERATURE: f32 = 0.7;

/// 连通性测试的 token 上限
const PROBE_MAX_TOKENS: u32 = 5;

/// 智谱答题时的 token 上限，多选答案 "A,C,D" 也够用
const ZHIPU_ANSWER_MAX_TOKENS: u32 = 10;

enum Backend {
    OpenAi {
        client: Client<OpenAIConfig>,
    },
    Zhipu {
        http: reqwest::Client,
        base_url: String,
        api_key: String,
    },
}

/// LLM 服务
///
/// 职责：
/// - 按配置选择后端
/// - 提供通用的 `send_to_llm` 调用接口
/// - 提供连通性测试
pub struct LlmService {
    backend: Backend,
    provider: AiProvider,
    model_name: String,
}

#[derive(Serialize)]
struct ZhipuMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ZhipuRequest<'a> {
    model: &'a str,
    messages: Vec<ZhipuMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ZhipuResponse {
    #[serde(default)]
    choices: Vec<ZhipuChoice>,
}

#[derive(Deserialize)]
struct ZhipuChoice {
    message: ZhipuChoiceMessage,
}

#[derive(Deserialize)]
struct ZhipuChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmService {
    /// 创建新的 LLM 服务，未配置 API Key 时返回错误
    pub fn new(config: &AiConfig) -> Result<Self, LlmError> {
        match config.provider {
            AiProvider::OpenAi => {
                if config.openai_api_key.trim().is_empty() {
                    return Err(LlmError::MissingApiKey { provider: "openai" });
                }
                // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
                let openai_config = OpenAIConfig::new()
                    .with_api_key(&config.openai_api_key)
                    .with_api_base(&config.openai_base_url);

                Ok(Self {
                    backend: Backend::OpenAi {
                        client: Client::with_config(openai_config),
                    },
                    provider: AiProvider::OpenAi,
                    model_name: config.openai_model.clone(),
                })
            }
            AiProvider::Zhipu => {
                if config.zhipu_api_key.trim().is_empty() {
                    return Err(LlmError::MissingApiKey { provider: "zhipu" });
                }
                Ok(Self {
                    backend: Backend::Zhipu {
                        http: reqwest::Client::new(),
                        base_url: config.zhipu_base_url.trim_end_matches('/').to_string(),
                        api_key: config.zhipu_api_key.clone(),
                    },
                    provider: AiProvider::Zhipu,
                    model_name: config.zhipu_model.clone(),
                })
            }
        }
    }

    pub fn provider(&self) -> AiProvider {
        self.provider
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选，智谱后端忽略）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（已 trim）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String> {
        let max_tokens = match self.backend {
            Backend::OpenAi { .. } => None,
            Backend::Zhipu { .. } => Some(ZHIPU_ANSWER_MAX_TOKENS),
        };
        self.complete(user_message, system_message, max_tokens).await
    }

    /// 发送 "测试" 检查 Key / 地址 / 模型是否可用
    pub async fn probe(&self) -> Result<String> {
        info!(
            "🔌 测试 AI 连接 ({} / {})",
            self.provider.name(),
            self.model_name
        );
        let reply = self.complete("测试", None, Some(PROBE_MAX_TOKENS)).await?;
        info!("✓ AI 连接测试成功，响应: {}", reply);
        Ok(reply)
    }

    async fn complete(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let content = match &self.backend {
            Backend::OpenAi { client } => {
                self.complete_openai(client, user_message, system_message, max_tokens)
                    .await?
            }
            Backend::Zhipu {
                http,
                base_url,
                api_key,
            } => {
                self.complete_zhipu(http, base_url, api_key, user_message, max_tokens)
                    .await?
            }
        };

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(LlmError::EmptyContent {
                model: self.model_name.clone(),
            }
            .into());
        }
        debug!("LLM API 调用成功");
        Ok(content)
    }

    async fn complete_openai(
        &self,
        client: &Client<OpenAIConfig>,
        user_message: &str,
        system_message: Option<&str>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        // 构建消息列表
        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // 构建请求
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model_name)
            .messages(messages)
            .temperature(ANSWER_TEMPERATURE);
        if let Some(limit) = max_tokens {
            args.max_tokens(limit);
        }
        let request = args.build()?;

        // 调用 API
        let response = client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            LlmError::RequestFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        // 提取响应内容
        Ok(response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default())
    }

    async fn complete_zhipu(
        &self,
        http: &reqwest::Client,
        base_url: &str,
        api_key: &str,
        user_message: &str,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", base_url);
        let body = ZhipuRequest {
            model: &self.model_name,
            messages: vec![ZhipuMessage {
                role: "user",
                content: user_message,
            }],
            temperature: ANSWER_TEMPERATURE,
            max_tokens,
        };

        let request_failed = |message: String| {
            warn!("LLM API 调用失败: {}", message);
            LlmError::RequestFailed {
                model: self.model_name.clone(),
                message,
            }
        };

        let response = http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(500).collect();
            return Err(request_failed(format!("HTTP {}: {}", status, snippet)).into());
        }

        let parsed: ZhipuResponse = response
            .json()
            .await
            .map_err(|e| request_failed(format!("响应解析失败: {}", e)))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
