//! 多窗口完成轮询
//!
//! 轮流检查每个学习窗口：完成后点"学习下一节"，没有下一节时回课程列表找下一门，
//! 都不行就退出该窗口。所有窗口退出后循环结束。
//!
//! 浏览器操作通过 `TabDriver` 完成，每次读写之前都先 `focus`。

use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::completion::completion_signal;
use crate::config::AutomationConfig;
use crate::models::{PageSignals, TabHandle, Target, TargetState};
use crate::utils::StopFlag;

/// 轮询器对浏览器的全部需求
#[allow(async_fn_in_trait)]
pub trait TabDriver {
    /// 切换到该窗口，之后的操作都作用在它上面
    async fn focus(&mut self, handle: &TabHandle) -> Result<()>;

    /// 读取完成判定需要的页面状态
    async fn probe(&mut self, handle: &TabHandle) -> Result<PageSignals>;

    /// 点击"学习下一节"，按钮不存在或不可见时返回 false
    async fn click_next(&mut self, handle: &TabHandle) -> Result<bool>;

    /// 回到课程列表打开下一门未学完的课程，并让 `handle` 指向新页面
    ///
    /// 没有可学的课程时返回 false
    async fn open_next_from_course_list(&mut self, handle: &TabHandle) -> Result<bool>;

    /// 设置播放倍速
    async fn apply_speed(&mut self, handle: &TabHandle) -> Result<()>;

    /// 轮询结束后切回课程列表
    async fn restore_focus(&mut self) -> Result<()>;
}

/// 轮询参数
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// 每个窗口两次检测的最小间隔
    pub interval: Duration,
    /// 每轮之间的休眠
    pub tick: Duration,
    /// 连续出错多少次后放弃窗口
    pub stuck_after: u32,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            tick: Duration::from_secs(1),
            stuck_after: 1,
        }
    }
}

impl From<&AutomationConfig> for PollerSettings {
    fn from(config: &AutomationConfig) -> Self {
        Self {
            interval: config.check_interval(),
            tick: Duration::from_secs(1),
            stuck_after: config.stuck_after_errors.max(1),
        }
    }
}

/// 轮询结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// 完成的课时数
    pub units_completed: u32,
    /// 正常学完退出的窗口数
    pub targets_completed: usize,
    /// 因出错放弃的窗口数
    pub targets_stuck: usize,
    /// 被停止标志打断
    pub interrupted: bool,
}

impl PollReport {
    pub fn summary(&self) -> String {
        format!(
            "完成 {} 个课时，{} 个窗口学完，{} 个窗口出错退出{}",
            self.units_completed,
            self.targets_completed,
            self.targets_stuck,
            if self.interrupted { "（已中断）" } else { "" }
        )
    }
}

/// 多窗口完成轮询器
pub struct CompletionPoller {
    settings: PollerSettings,
}

impl CompletionPoller {
    pub fn new(settings: PollerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// 轮询直到所有窗口退出或收到停止信号
    pub async fn run<D: TabDriver>(
        &self,
        driver: &mut D,
        handles: Vec<TabHandle>,
        stop: &StopFlag,
    ) -> PollReport {
        let mut targets: Vec<Target> = handles
            .into_iter()
            .enumerate()
            .map(|(i, h)| Target::new(i + 1, h))
            .collect();
        let mut report = PollReport::default();

        info!("{}", "=".repeat(60));
        info!("🎬 多窗口监控已启动 (共 {} 个窗口)", targets.len());
        info!("{}", "=".repeat(60));

        for target in targets.iter_mut() {
            self.start_target(driver, target).await;
        }

        loop {
            if stop.is_stopped() {
                info!("⏹️ 收到停止信号，结束监控");
                report.interrupted = true;
                break;
            }
            if targets.iter().all(Target::is_retired) {
                info!("✅ 所有窗口的视频都已完成");
                break;
            }

            let now = Instant::now();
            for target in targets.iter_mut() {
                if target.is_retired() || !target.is_due(now, self.settings.interval) {
                    continue;
                }
                target.last_checked = Some(now);

                match self.check_target(driver, target, &mut report).await {
                    Ok(()) => target.consecutive_errors = 0,
                    Err(e) => {
                        target.consecutive_errors += 1;
                        warn!(
                            "[窗口 {}] 检测出错 ({}/{}): {}",
                            target.index, target.consecutive_errors, self.settings.stuck_after, e
                        );
                        if target.consecutive_errors >= self.settings.stuck_after {
                            warn!("⚠️ [窗口 {}] 放弃该窗口", target.index);
                            target.state = TargetState::Stuck;
                        }
                    }
                }

                if stop.is_stopped() {
                    break;
                }
            }

            if !targets.iter().all(Target::is_retired) && stop.keep_running() {
                sleep(self.settings.tick).await;
            }
        }

        report.targets_completed = targets
            .iter()
            .filter(|t| t.state == TargetState::Completed)
            .count();
        report.targets_stuck = targets
            .iter()
            .filter(|t| t.state == TargetState::Stuck)
            .count();

        if let Err(e) = driver.restore_focus().await {
            warn!("切回课程列表失败: {}", e);
        }

        info!("📊 {}", report.summary());
        report
    }

    /// 首次进入窗口时设置倍速，失败不影响后续轮询
    async fn start_target<D: TabDriver>(&self, driver: &mut D, target: &mut Target) {
        let result = async {
            driver.focus(&target.handle).await?;
            driver.apply_speed(&target.handle).await
        }
        .await;
        if let Err(e) = result {
            warn!("[窗口 {}] 设置倍速失败: {}", target.index, e);
        }
        target.state = TargetState::Playing;
    }

    async fn check_target<D: TabDriver>(
        &self,
        driver: &mut D,
        target: &mut Target,
        report: &mut PollReport,
    ) -> Result<()> {
        driver.focus(&target.handle).await?;
        target.check_count += 1;

        let signals = driver.probe(&target.handle).await?;
        let Some(signal) = completion_signal(&signals) else {
            debug!("[窗口 {} 检测 #{}] 播放中...", target.index, target.check_count);
            return Ok(());
        };

        info!(
            "[窗口 {} 检测 #{}] 课时完成（{}）",
            target.index,
            target.check_count,
            signal.describe()
        );
        target.units_completed += 1;
        report.units_completed += 1;

        let advanced = if driver.click_next(&target.handle).await? {
            info!("  -> 窗口 {}: 已点击'学习下一节'", target.index);
            true
        } else {
            info!("  -> 窗口 {}: 没有下一节，返回课程列表查找", target.index);
            driver.open_next_from_course_list(&target.handle).await?
        };

        if advanced {
            target.check_count = 0;
            driver.focus(&target.handle).await?;
            if let Err(e) = driver.apply_speed(&target.handle).await {
                warn!("[窗口 {}] 设置倍速失败: {}", target.index, e);
            }
            info!(
                "  -> 窗口 {}: 已切换到下一个视频 (总完成: {})",
                target.index, report.units_completed
            );
        } else {
            info!("  -> 窗口 {}: 所有视频已完成", target.index);
            target.state = TargetState::Completed;
        }
        Ok(())
    }
}
