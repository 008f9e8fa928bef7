//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责任务调度和资源管理，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用主体
//! - 启动浏览器、登录（唯一持有 `Session`）
//! - 顺序 / 并行执行任务
//! - Ctrl+C 停止信号
//! - 输出全局统计信息
//!
//! ### `task_runner` - 单个任务执行器
//! - 为任务准备答题策略和调试现场保存
//! - 调用对应的 workflow
//!
//! ## 层次关系
//!
//! ```text
//! app (处理 Vec<Task>)
//!     ↓
//! task_runner (处理单个 Task)
//!     ↓
//! workflow (video / homework / exam 流程)
//!     ↓
//! services (能力层：answer / llm / selector / dump)
//!     ↓
//! infrastructure (基础设施：Session / JsExecutor)
//! ```

pub mod app;
pub mod task;
pub mod task_runner;

pub use app::App;
pub use task::Task;
pub use task_runner::run_task;
