//! 应用主体 - 编排层
//!
//! ## 职责
//!
//! 1. **资源管理**：启动浏览器并登录，唯一持有 `Session` 的模块
//! 2. **任务调度**：顺序模式共用一个浏览器；并行模式每个任务一个浏览器
//! 3. **停止信号**：Ctrl+C 设置停止标志，各任务在步骤之间检查
//! 4. **全局统计**：汇总每个任务的结果
//!
//! 任务结束后浏览器保持打开，再按一次 Ctrl+C 退出程序。
//! 任务被 Ctrl+C 中断时同样保留浏览器供检查，需要再按一次 Ctrl+C 才退出。

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::task::Task;
use super::task_runner::run_task;
use crate::config::Config;
use crate::infrastructure::Session;
use crate::utils::logging::{log_startup, log_task_complete, log_task_start, print_final_stats};
use crate::utils::StopFlag;
use crate::workflow::navigation;

/// 任务统计
#[derive(Debug, Default)]
struct RunStats {
    success: usize,
    failed: usize,
}

impl RunStats {
    fn record(&mut self, task: Task, result: Result<String>) {
        match result {
            Ok(summary) => {
                self.success += 1;
                log_task_complete(task.name(), &summary);
            }
            Err(e) => {
                self.failed += 1;
                error!("❌ 任务 {} 失败: {:#}", task, e);
            }
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    tasks: Vec<Task>,
    parallel: bool,
    stop: StopFlag,
}

impl App {
    pub fn new(config: Config, tasks: &[Task], parallel: bool) -> Self {
        Self {
            config,
            tasks: Task::normalize(tasks),
            parallel,
            stop: StopFlag::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// 运行所有任务
    pub async fn run(&self) -> Result<()> {
        let names: Vec<&str> = self.tasks.iter().map(Task::name).collect();
        log_startup(&names, self.parallel);
        self.watch_ctrl_c();

        let (stats, sessions) = if self.parallel {
            self.run_parallel().await
        } else {
            self.run_sequential().await
        };

        print_final_stats(stats.success, stats.failed);

        if !sessions.is_empty() {
            self.hold_open().await;
        }
        drop(sessions);
        Ok(())
    }

    /// 所有任务共用一个浏览器，依次执行
    async fn run_sequential(&self) -> (RunStats, Vec<Session>) {
        let mut stats = RunStats::default();

        let mut session = match open_session(&self.config).await {
            Ok(session) => session,
            Err(e) => {
                error!("❌ 浏览器启动或登录失败: {:#}", e);
                stats.failed = self.tasks.len();
                return (stats, Vec::new());
            }
        };

        for &task in &self.tasks {
            if self.stop.is_stopped() {
                warn!("⏹️ 已停止，跳过任务 {}", task);
                break;
            }
            log_task_start(task.name());
            let result = run_task(&mut session, &self.config, task, &self.stop).await;
            stats.record(task, result);
        }

        (stats, vec![session])
    }

    /// 每个任务启动独立的浏览器并行执行
    async fn run_parallel(&self) -> (RunStats, Vec<Session>) {
        let mut handles: Vec<(Task, JoinHandle<(Result<String>, Option<Session>)>)> = Vec::new();

        for &task in &self.tasks {
            let config = self.config.clone();
            let stop = self.stop.clone();
            let handle = tokio::spawn(async move {
                log_task_start(task.name());
                let mut session = match open_session(&config).await {
                    Ok(session) => session,
                    Err(e) => return (Err(e), None),
                };
                let result = run_task(&mut session, &config, task, &stop).await;
                (result, Some(session))
            });
            handles.push((task, handle));
        }

        let mut stats = RunStats::default();
        let mut sessions = Vec::new();
        for (task, handle) in handles {
            match handle.await {
                Ok((result, session)) => {
                    stats.record(task, result);
                    sessions.extend(session);
                }
                Err(e) => {
                    error!("[{}] 任务执行失败: {}", task, e);
                    stats.failed += 1;
                }
            }
        }
        (stats, sessions)
    }

    fn watch_ctrl_c(&self) {
        let stop = self.stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⏹️ 收到 Ctrl+C，正在停止任务...");
                stop.stop();
            }
        });
    }

    /// 任务结束后保持浏览器打开
    async fn hold_open(&self) {
        hold_until(&self.stop, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("监听 Ctrl+C 失败: {}", e);
            }
        })
        .await;
    }
}

/// 阻塞到可以关闭浏览器为止
///
/// 任务正常结束时等待停止信号；任务已被中断时等待 `exit`（再一次 Ctrl+C）
async fn hold_until<F: Future<Output = ()>>(stop: &StopFlag, exit: F) {
    if stop.is_stopped() {
        info!("任务已中断，浏览器保持打开供检查，再按一次 Ctrl+C 退出程序");
        exit.await;
        return;
    }
    info!("浏览器保持打开，按 Ctrl+C 退出程序");
    while stop.keep_running() {
        sleep(Duration::from_secs(1)).await;
    }
}

/// 启动浏览器并登录
async fn open_session(config: &Config) -> Result<Session> {
    let mut session = Session::launch(config)
        .await
        .context("浏览器启动失败")?;
    navigation::login(&mut session, &config.website)
        .await
        .context("登录失败")?;
    Ok(session)
}
