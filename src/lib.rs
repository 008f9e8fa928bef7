//! # Auto Study
//!
//! 网课平台自动学习工具：多窗口刷视频、自动完成作业和考试
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 启动 Chromium（窗口尺寸、无头模式、重试）
//! - `infrastructure/` - 持有稀缺资源（Browser、Page），只暴露能力
//! - `Session` - 唯一的浏览器 owner，管理标签页与焦点切换
//! - `JsExecutor` - 在当前页面执行脚本、查找和点击元素
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，与具体页面流程无关
//! - `AnswerResolver` - 随机 / LLM 两种答题策略
//! - `LlmService` - OpenAI 兼容接口与智谱接口
//! - `select_next_item` - 作业选择规则
//! - `PageDumper` - 保存截图和页面源码
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义登录、导航和三类任务的完整流程
//! - `CompletionPoller` - 多窗口视频完成轮询
//! - `homework_flow` / `exam_flow` - 作业与考试流程
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 启动浏览器、登录、顺序或并行调度任务
//! - `orchestrator/task_runner` - 运行单个任务
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{BrowserError, ConfigError, LlmError, Result};
pub use infrastructure::{JsExecutor, Session};
pub use models::{Answer, HomeworkItem, Question, TabHandle};
pub use orchestrator::{App, Task};
pub use workflow::{CompletionPoller, PollReport, TabDriver};
