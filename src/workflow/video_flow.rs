//! 视频学习流程
//!
//! 课程列表 → 同时打开多门未学完的课程 → 交给 `CompletionPoller` 轮询

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::navigation;
use super::poller::{CompletionPoller, PollReport, PollerSettings, TabDriver};
use super::portal;
use crate::config::Config;
use crate::infrastructure::{Locator, LocatorChain, Session};
use crate::models::course::RawCourseRow;
use crate::models::{CourseEntry, PageSignals, TabHandle, VideoSpeed};
use crate::utils::StopFlag;

/// 读取课程列表
pub async fn discover_courses(session: &Session) -> Result<Vec<CourseEntry>> {
    let rows: Option<Vec<RawCourseRow>> = session.current()?.eval_as(portal::COURSE_ROWS_JS).await?;
    let courses: Vec<CourseEntry> = rows
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, raw)| CourseEntry::from_raw(i, raw))
        .collect();

    for course in &courses {
        match course.progress {
            Some(p) => debug!("课程: {}, 进度: {}%", course.title, p),
            None => debug!("课程: {}, 进度: 未知", course.title),
        }
    }
    Ok(courses)
}

/// 重新打开课程前如何回到课程列表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListRefresh {
    /// 课程列表在独立窗口中，刷新即可
    Reload,
    /// 主窗口正在播放视频，需要重新进入课程列表
    Navigate,
}

impl ListRefresh {
    fn for_target(target: &TabHandle, course_list: &TabHandle) -> Self {
        if target == course_list {
            ListRefresh::Navigate
        } else {
            ListRefresh::Reload
        }
    }
}

/// 基于 `Session` 的窗口驱动
pub struct ChromeTabDriver<'a> {
    session: &'a mut Session,
    speed: VideoSpeed,
    course_list: TabHandle,
    /// 平台首页，主窗口被视频占用时从这里回到课程列表
    home_url: String,
    /// 每个窗口当前在学的课程
    open_courses: HashMap<TabHandle, String>,
    /// 本次运行中已经学完的课程，不再重新打开
    finished_courses: HashSet<String>,
}

impl<'a> ChromeTabDriver<'a> {
    pub fn new(
        session: &'a mut Session,
        speed: VideoSpeed,
        course_list: TabHandle,
        home_url: impl Into<String>,
    ) -> Self {
        Self {
            session,
            speed,
            course_list,
            home_url: home_url.into(),
            open_courses: HashMap::new(),
            finished_courses: HashSet::new(),
        }
    }

    /// 记录窗口正在学习的课程
    pub fn track(&mut self, handle: TabHandle, title: String) {
        self.open_courses.insert(handle, title);
    }

    async fn apply_speed_via_menu(&mut self) -> Result<()> {
        let setting = portal::speed_setting();
        if !self.session.click(&setting).await? {
            bail!("未找到倍速设置按钮");
        }
        sleep(Duration::from_secs(1)).await;

        let label = self.speed.menu_label();
        if !self.session.click(&portal::speed_option(label)).await? {
            bail!("未找到倍速选项 {}", label);
        }
        Ok(())
    }
}

impl TabDriver for ChromeTabDriver<'_> {
    async fn focus(&mut self, handle: &TabHandle) -> Result<()> {
        self.session.focus(handle).await.map(|_| ())
    }

    async fn probe(&mut self, _handle: &TabHandle) -> Result<PageSignals> {
        let signals: Option<PageSignals> = self
            .session
            .current()?
            .eval_as(portal::PROBE_SIGNALS_JS)
            .await?;
        signals.ok_or_else(|| anyhow::anyhow!("页面状态为空，页面可能正在跳转"))
    }

    async fn click_next(&mut self, _handle: &TabHandle) -> Result<bool> {
        let next = portal::next_section();
        if !self.session.current()?.is_visible(&next).await? {
            return Ok(false);
        }
        if !self.session.click(&next).await? {
            return Ok(false);
        }
        sleep(Duration::from_secs(3)).await;
        self.session.wait_for_page_load().await;
        Ok(true)
    }

    async fn open_next_from_course_list(&mut self, handle: &TabHandle) -> Result<bool> {
        if let Some(done) = self.open_courses.remove(handle) {
            self.finished_courses.insert(done);
        }

        let course_list = self.course_list.clone();
        self.session.focus(&course_list).await?;
        match ListRefresh::for_target(handle, &course_list) {
            ListRefresh::Reload => self.session.reload().await?,
            ListRefresh::Navigate => {
                debug!("课程在主窗口中播放，回到首页重新进入课程列表");
                self.session.goto(&self.home_url).await?;
                navigation::to_courses(self.session).await?
            }
        }

        let courses = discover_courses(self.session).await?;
        let next = {
            let busy: HashSet<&String> = self.open_courses.values().collect();
            courses.into_iter().find(|c| {
                c.is_unfinished()
                    && !busy.contains(&c.title)
                    && !self.finished_courses.contains(&c.title)
            })
        };
        let Some(course) = next else {
            info!("所有课程已完成或无更多课程");
            return Ok(false);
        };

        info!(
            "打开课程: {} (进度: {}%)",
            course.title,
            course.progress.unwrap_or(0.0)
        );
        let Some(new_tab) = self
            .session
            .capture_new_tab(&portal::click_course_js(course.index))
            .await?
        else {
            if handle == &course_list {
                // 课程直接在主窗口打开，继续轮询这个窗口
                self.session.wait_for_page_load().await;
                self.open_courses.insert(handle.clone(), course.title);
                return Ok(true);
            }
            warn!("⚠️ 点击'进入学习'后没有打开新窗口");
            return Ok(false);
        };

        self.session.rebind(handle, &new_tab).await?;
        self.session.focus(handle).await?;
        self.session.wait_for_page_load().await;
        self.open_courses.insert(handle.clone(), course.title);
        Ok(true)
    }

    async fn apply_speed(&mut self, handle: &TabHandle) -> Result<()> {
        let video: LocatorChain = Locator::css("video").into();
        self.session.wait_for(&video, Some(Duration::from_secs(5))).await?;

        let js = self.session.current()?;
        let set: Option<bool> = js
            .eval_as(portal::set_playback_rate_js(self.speed.rate()))
            .await?;
        if set.unwrap_or(false) {
            info!("  -> {}: 倍速已设置为 {}", handle, self.speed);
            return Ok(());
        }

        debug!("未找到 video 元素，改用播放器菜单设置倍速");
        self.apply_speed_via_menu().await?;
        info!("  -> {}: 倍速已设置为 {} (菜单)", handle, self.speed);
        Ok(())
    }

    async fn restore_focus(&mut self) -> Result<()> {
        let course_list = self.course_list.clone();
        self.session.focus(&course_list).await.map(|_| ())
    }
}

/// 视频学习任务
pub async fn run(session: &mut Session, config: &Config, stop: &StopFlag) -> Result<PollReport> {
    let main = session.main_handle();
    session.focus(&main).await?;
    navigation::to_courses(session).await?;

    let courses = discover_courses(session).await?;
    if courses.is_empty() {
        warn!("未找到任何'进入学习'按钮");
        return Ok(PollReport::default());
    }
    info!("找到 {} 个课程", courses.len());

    let pending: Vec<CourseEntry> = courses.into_iter().filter(|c| c.is_unfinished()).collect();
    if pending.is_empty() {
        info!("🎉 所有课程都已完成！");
        return Ok(PollReport::default());
    }

    let open_count = config.automation.concurrent_videos.min(pending.len());
    info!(
        "共有 {} 个未完成课程，准备打开 {} 个视频窗口",
        pending.len(),
        open_count
    );

    let mut opened: Vec<(TabHandle, String)> = Vec::new();
    for (i, course) in pending.iter().take(open_count).enumerate() {
        if stop.is_stopped() {
            break;
        }
        session.focus(&main).await?;
        info!(
            "打开第 {} 个视频: {} (进度: {}%)",
            i + 1,
            course.title,
            course.progress.unwrap_or(0.0)
        );
        match session
            .capture_new_tab(&portal::click_course_js(course.index))
            .await?
        {
            Some(handle) => opened.push((handle, course.title.clone())),
            None => {
                warn!("  -> 未检测到新窗口，课程可能在当前窗口打开");
                opened.push((main.clone(), course.title.clone()));
                break;
            }
        }
        sleep(Duration::from_secs(1)).await;
    }

    if opened.is_empty() {
        bail!("没有成功打开任何视频窗口");
    }
    info!("成功打开 {} 个视频窗口，开始监控...", opened.len());

    for (handle, _) in &opened {
        session.focus(handle).await?;
        session.wait_for_page_load().await;
    }

    let handles: Vec<TabHandle> = opened.iter().map(|(h, _)| h.clone()).collect();
    let poller = CompletionPoller::new(PollerSettings::from(&config.automation));
    let mut driver = ChromeTabDriver::new(
        session,
        config.automation.video_speed,
        main,
        config.website.url.clone(),
    );
    for (handle, title) in opened {
        driver.track(handle, title);
    }

    Ok(poller.run(&mut driver, handles, stop).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_list_tab_is_reloaded() {
        let list = TabHandle::new("tab-1");
        assert_eq!(
            ListRefresh::for_target(&TabHandle::new("tab-2"), &list),
            ListRefresh::Reload
        );
    }

    #[test]
    fn test_course_playing_in_main_tab_navigates_back() {
        let list = TabHandle::new("tab-1");
        assert_eq!(
            ListRefresh::for_target(&TabHandle::new("tab-1"), &list),
            ListRefresh::Navigate
        );
    }
}
