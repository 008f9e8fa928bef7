//! 程序配置
//!
//! 配置来自 TOML 文件（默认 `config.toml`），敏感字段可由环境变量覆盖。
//! 加载或校验失败时由 `main` 直接以非零状态退出。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::VideoSpeed;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub website: WebsiteConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
    #[serde(default)]
    pub homework: HomeworkConfig,
    #[serde(default)]
    pub exam: ExamConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebsiteConfig {
    /// 学习平台首页（登录页）
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub window_width: u32,
    pub window_height: u32,
    /// 无头模式（后台运行）
    pub headless: bool,
    /// 自定义 Chrome/Edge 路径，不填则自动查找
    pub chrome_executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            window_width: 1920,
            window_height: 1080,
            headless: false,
            chrome_executable: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// 元素查找超时（秒）
    pub element_timeout: u64,
    /// 页面加载超时（秒）
    pub page_load_timeout: u64,
    /// 模拟人类操作的随机延迟
    pub enable_delays: bool,
    pub video_speed: VideoSpeed,
    /// 同时打开的视频窗口数
    pub concurrent_videos: usize,
    /// 每个窗口的检测间隔（秒）
    pub check_interval_secs: u64,
    /// 连续出错多少次后放弃该窗口
    pub stuck_after_errors: u32,
    /// 浏览器启动重试次数
    pub launch_retries: u32,
    pub launch_backoff_secs: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            element_timeout: 10,
            page_load_timeout: 30,
            enable_delays: false,
            video_speed: VideoSpeed::X2,
            concurrent_videos: 3,
            check_interval_secs: 5,
            stuck_after_errors: 1,
            launch_retries: 3,
            launch_backoff_secs: 3,
        }
    }
}

impl AutomationConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HomeworkConfig {
    /// 使用 AI 答题，否则随机选择
    pub use_ai: bool,
    pub auto_submit: bool,
    pub min_passing_score: u32,
    /// 不及格重做
    pub retry_if_failed: bool,
}

impl Default for HomeworkConfig {
    fn default() -> Self {
        Self {
            use_ai: true,
            auto_submit: true,
            min_passing_score: 60,
            retry_if_failed: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExamConfig {
    /// 每题之间的随机延迟下限（秒）
    pub answer_delay_min: f64,
    pub answer_delay_max: f64,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            answer_delay_min: 0.1,
            answer_delay_max: 0.3,
        }
    }
}

/// 支持的 AI 提供商
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// OpenAI 兼容接口（OpenAI / Kimi / DeepSeek 等）
    #[default]
    OpenAi,
    /// 智谱 GLM
    Zhipu,
}

impl AiProvider {
    pub fn name(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Zhipu => "zhipu",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub zhipu_api_key: String,
    pub zhipu_base_url: String,
    pub zhipu_model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::OpenAi,
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            zhipu_api_key: String::new(),
            zhipu_base_url: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            zhipu_model: "glm-4-flash".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// 操作前给元素加红框
    pub highlight_elements: bool,
    pub highlight_duration_ms: u64,
    /// 截图和页面源码的保存目录
    pub dump_dir: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            highlight_elements: true,
            highlight_duration_ms: 1000,
            dump_dir: PathBuf::from("debug_screenshots"),
        }
    }
}

impl Config {
    /// 从 TOML 文件加载配置，随后应用环境变量覆盖并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 仅解析，不读取环境变量
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: String::new(),
            source,
        })
    }

    /// 密码和 API Key 允许放在环境变量里，避免写进配置文件
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("AUTO_STUDY_PASSWORD") {
            self.website.password = v;
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.ai.openai_api_key = v;
        }
        if let Ok(v) = std::env::var("ZHIPU_API_KEY") {
            self.ai.zhipu_api_key = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.website.url.trim().is_empty() {
            return Err(ConfigError::invalid("website.url", "不能为空"));
        }
        if self.homework.min_passing_score > 100 {
            return Err(ConfigError::invalid(
                "homework.min_passing_score",
                format!("{} 超出 0-100", self.homework.min_passing_score),
            ));
        }
        if self.automation.concurrent_videos == 0 {
            return Err(ConfigError::invalid("automation.concurrent_videos", "至少为 1"));
        }
        if self.automation.launch_retries == 0 {
            return Err(ConfigError::invalid("automation.launch_retries", "至少为 1"));
        }
        if self.exam.answer_delay_min < 0.0 || self.exam.answer_delay_min > self.exam.answer_delay_max {
            return Err(ConfigError::invalid(
                "exam.answer_delay_min/answer_delay_max",
                "需满足 0 <= min <= max",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[website]
url = "https://example.edu.cn/"
username = "student"
password = "secret"
"#;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.website.username, "student");
        assert_eq!(config.automation.concurrent_videos, 3);
        assert_eq!(config.automation.video_speed, VideoSpeed::X2);
        assert_eq!(config.homework.min_passing_score, 60);
        assert_eq!(config.ai.provider, AiProvider::OpenAi);
        assert_eq!(config.ai.zhipu_model, "glm-4-flash");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = Config::from_toml_str(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config.automation.video_speed, VideoSpeed::X2);
        assert_eq!(config.debug.dump_dir, PathBuf::from("debug_screenshots"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_sections_parse() {
        let content = r#"
[website]
url = "https://example.edu.cn/"

[browser]
headless = true
window_width = 1280

[automation]
video_speed = "1.5X"
concurrent_videos = 2

[homework]
use_ai = false
retry_if_failed = false
min_passing_score = 80

[ai]
provider = "zhipu"
zhipu_api_key = "k"

[debug]
highlight_elements = false
"#;
        let config = Config::from_toml_str(content).unwrap();
        assert!(config.browser.headless);
        assert_eq!(config.browser.window_width, 1280);
        assert_eq!(config.browser.window_height, 1080);
        assert_eq!(config.automation.video_speed, VideoSpeed::X1_5);
        assert!(!config.homework.use_ai);
        assert_eq!(config.homework.min_passing_score, 80);
        assert_eq!(config.ai.provider, AiProvider::Zhipu);
        assert!(!config.debug.highlight_elements);
    }

    #[test]
    fn test_missing_website_is_error() {
        let result = Config::from_toml_str("[browser]\nheadless = true\n");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_unknown_provider_is_error() {
        let content = format!("{}\n[ai]\nprovider = \"claude\"\n", MINIMAL);
        assert!(Config::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::from_toml_str(MINIMAL).unwrap();
        config.homework.min_passing_score = 120;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = Config::from_toml_str(MINIMAL).unwrap();
        config.automation.concurrent_videos = 0;
        assert!(config.validate().is_err());

        let mut config = Config::from_toml_str(MINIMAL).unwrap();
        config.exam.answer_delay_min = 1.0;
        config.exam.answer_delay_max = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("definitely/not/here/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
