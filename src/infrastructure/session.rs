//! 浏览器会话
//!
//! 一个 `Session` 对应一个浏览器进程。所有写操作之前都要先 `focus` 到目标标签页，
//! 保证同一时刻只有一个标签页在被操作。

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use chromiumoxide::{Browser, Page};
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::js_executor::JsExecutor;
use super::locator::LocatorChain;
use crate::browser::launch_browser;
use crate::config::Config;
use crate::error::BrowserError;
use crate::models::TabHandle;

/// 会话行为参数，来自配置
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub element_timeout: Duration,
    pub page_load_timeout: Duration,
    pub highlight: bool,
    pub highlight_duration: Duration,
    pub enable_delays: bool,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            element_timeout: config.automation.element_timeout(),
            page_load_timeout: config.automation.page_load_timeout(),
            highlight: config.debug.highlight_elements,
            highlight_duration: Duration::from_millis(config.debug.highlight_duration_ms),
            enable_delays: config.automation.enable_delays,
        }
    }
}

struct Tab {
    handle: TabHandle,
    page: Page,
}

/// 浏览器会话
pub struct Session {
    browser: Browser,
    settings: SessionSettings,
    tabs: Vec<Tab>,
    main: TabHandle,
    focused: TabHandle,
    next_id: usize,
}

impl Session {
    /// 启动浏览器并创建会话
    pub async fn launch(config: &Config) -> Result<Self> {
        let (browser, page) = launch_browser(&config.browser, &config.automation).await?;
        Ok(Self::new(browser, page, SessionSettings::from(config)))
    }

    pub fn new(browser: Browser, page: Page, settings: SessionSettings) -> Self {
        let main = TabHandle::new("tab-1");
        Self {
            browser,
            settings,
            tabs: vec![Tab {
                handle: main.clone(),
                page,
            }],
            focused: main.clone(),
            main,
            next_id: 2,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// 主标签页（登录页 / 课程列表）
    pub fn main_handle(&self) -> TabHandle {
        self.main.clone()
    }

    pub fn focused_handle(&self) -> TabHandle {
        self.focused.clone()
    }

    pub fn handles(&self) -> Vec<TabHandle> {
        self.tabs.iter().map(|t| t.handle.clone()).collect()
    }

    fn page_of(&self, handle: &TabHandle) -> Result<&Page> {
        self.tabs
            .iter()
            .find(|t| &t.handle == handle)
            .map(|t| &t.page)
            .ok_or_else(|| BrowserError::TabGone(handle.to_string()).into())
    }

    /// 切换到指定标签页并返回它的执行器
    pub async fn focus(&mut self, handle: &TabHandle) -> Result<JsExecutor> {
        let page = self.page_of(handle)?.clone();
        page.bring_to_front()
            .await
            .with_context(|| format!("切换到标签页 {} 失败", handle))?;
        if &self.focused != handle {
            debug!("切换标签页: {} → {}", self.focused, handle);
        }
        self.focused = handle.clone();
        Ok(JsExecutor::new(page))
    }

    /// 当前标签页的执行器
    pub fn current(&self) -> Result<JsExecutor> {
        Ok(JsExecutor::new(self.page_of(&self.focused)?.clone()))
    }

    /// 当前标签页的地址
    pub async fn current_url(&self) -> Result<String> {
        let page = self.page_of(&self.focused)?;
        Ok(page.url().await?.unwrap_or_default())
    }

    /// 当前标签页导航到 `url` 并等待加载
    ///
    /// 导航失败或超时只记录日志，流程继续；只有标签页不存在时返回错误
    pub async fn goto(&self, url: &str) -> Result<()> {
        let page = self.page_of(&self.focused)?;
        info!("🌐 打开: {}", url);
        if let Err(e) = page.goto(url).await {
            warn!("⚠️ 导航到 {} 未完成，继续执行: {}", url, e);
        }
        self.wait_for_page_load().await;
        Ok(())
    }

    /// 刷新当前标签页
    pub async fn reload(&self) -> Result<()> {
        let page = self.page_of(&self.focused)?;
        page.reload().await.context("刷新页面失败")?;
        self.wait_for_page_load().await;
        Ok(())
    }

    /// 等待 `document.readyState == "complete"`，再留一点时间给页面脚本
    ///
    /// 超时只记录日志，返回 false，流程继续
    pub async fn wait_for_page_load(&self) -> bool {
        let Ok(js) = self.current() else {
            return false;
        };
        let deadline = Instant::now() + self.settings.page_load_timeout;
        loop {
            match js.ready_state().await {
                Ok(state) if state == "complete" => {
                    sleep(Duration::from_secs(2)).await;
                    debug!("页面加载完成");
                    return true;
                }
                Ok(_) => {}
                Err(e) => debug!("读取 readyState 失败: {}", e),
            }
            if Instant::now() >= deadline {
                warn!("⚠️ 页面加载超时 ({:?})", self.settings.page_load_timeout);
                return false;
            }
            sleep(Duration::from_millis(500)).await;
        }
    }

    /// 在当前标签页等待元素出现，超时返回 false
    ///
    /// 轮询间隔从 100ms 开始翻倍，最多 1s
    pub async fn wait_for(&self, chain: &LocatorChain, timeout: Option<Duration>) -> Result<bool> {
        let js = self.current()?;
        let timeout = timeout.unwrap_or(self.settings.element_timeout);
        let start = Instant::now();
        let mut poll_interval = Duration::from_millis(100);
        let max_interval = Duration::from_secs(1);

        loop {
            if js.exists(chain).await.unwrap_or(false) {
                debug!("找到元素: {}", chain);
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                debug!("未找到元素 (等待 {}ms): {}", timeout.as_millis(), chain);
                return Ok(false);
            }
            sleep(poll_interval).await;
            poll_interval = (poll_interval * 2).min(max_interval);
        }
    }

    /// 等待并点击元素：按配置高亮、随机延迟
    pub async fn click(&self, chain: &LocatorChain) -> Result<bool> {
        if !self.wait_for(chain, None).await? {
            return Ok(false);
        }
        let js = self.current()?;
        if self.settings.highlight {
            js.highlight(chain, self.settings.highlight_duration.as_millis() as u64)
                .await?;
            sleep(self.settings.highlight_duration).await;
        }
        let clicked = js.click(chain).await?;
        self.random_delay(0.1, 0.5).await;
        Ok(clicked)
    }

    /// 在当前标签页执行一段会点击元素的脚本，返回脚本结果
    pub async fn run_action(&self, js_code: &str) -> Result<serde_json::Value> {
        let value = self.current()?.eval(js_code).await?;
        self.random_delay(0.1, 0.5).await;
        Ok(value)
    }

    /// 模拟人类操作的随机延迟，仅在 `enable_delays` 打开时生效
    pub async fn random_delay(&self, min_secs: f64, max_secs: f64) {
        if !self.settings.enable_delays {
            return;
        }
        sleep(random_duration(min_secs, max_secs)).await;
    }

    /// 执行 `action` 并捕获由它打开的新标签页
    ///
    /// 没有新标签页时返回 None（可能在当前标签页内跳转）
    pub async fn capture_new_tab(&mut self, action_js: &str) -> Result<Option<TabHandle>> {
        let before: Vec<TargetId> = self
            .browser
            .pages()
            .await?
            .iter()
            .map(|p| p.target_id().clone())
            .collect();

        self.run_action(action_js).await?;

        // 新窗口最多等 5 秒
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            sleep(Duration::from_millis(500)).await;
            let pages = self.browser.pages().await?;
            if let Some(page) = pages
                .into_iter()
                .find(|p| !before.contains(p.target_id()))
            {
                let handle = self.register(page);
                info!("🗂️ 新标签页已打开: {}", handle);
                return Ok(Some(handle));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    /// 登记一个标签页
    pub fn register(&mut self, page: Page) -> TabHandle {
        let handle = TabHandle::new(format!("tab-{}", self.next_id));
        self.next_id += 1;
        self.tabs.push(Tab {
            handle: handle.clone(),
            page,
        });
        handle
    }

    /// 把 `handle` 指向 `replacement` 对应的页面，并关闭旧页面
    ///
    /// 用于从课程列表重新打开课程后，让轮询中的句柄继续有效
    pub async fn rebind(&mut self, handle: &TabHandle, replacement: &TabHandle) -> Result<()> {
        let pos = self
            .tabs
            .iter()
            .position(|t| &t.handle == replacement)
            .ok_or_else(|| BrowserError::TabGone(replacement.to_string()))?;
        let new_tab = self.tabs.remove(pos);

        let slot = self
            .tabs
            .iter_mut()
            .find(|t| &t.handle == handle)
            .ok_or_else(|| BrowserError::TabGone(handle.to_string()))?;
        let old_page = std::mem::replace(&mut slot.page, new_tab.page);

        if let Err(e) = old_page.close().await {
            debug!("关闭旧标签页失败: {}", e);
        }
        if &self.focused == replacement {
            self.focused = handle.clone();
        }
        Ok(())
    }

    /// 关闭标签页（主标签页不会被关闭）
    pub async fn close_tab(&mut self, handle: &TabHandle) -> Result<()> {
        if handle == &self.main {
            return Ok(());
        }
        if let Some(pos) = self.tabs.iter().position(|t| &t.handle == handle) {
            let tab = self.tabs.remove(pos);
            tab.page.close().await?;
            if &self.focused == handle {
                self.focused = self.main.clone();
            }
        }
        Ok(())
    }
}

/// `[min, max]` 秒之间的随机时长
pub fn random_duration(min_secs: f64, max_secs: f64) -> Duration {
    if max_secs <= min_secs {
        return Duration::from_secs_f64(min_secs.max(0.0));
    }
    let secs = rand::thread_rng().gen_range(min_secs..=max_secs);
    Duration::from_secs_f64(secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_duration_in_range() {
        for _ in 0..100 {
            let d = random_duration(0.1, 0.3);
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(300));
        }
    }

    #[test]
    fn test_random_duration_degenerate_range() {
        assert_eq!(random_duration(0.5, 0.5), Duration::from_millis(500));
        assert_eq!(random_duration(0.5, 0.1), Duration::from_millis(500));
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config::from_toml_str("[website]\nurl = \"https://example.edu.cn/\"\n").unwrap();
        let settings = SessionSettings::from(&config);
        assert_eq!(settings.element_timeout, Duration::from_secs(10));
        assert_eq!(settings.page_load_timeout, Duration::from_secs(30));
        assert!(settings.highlight);
        assert!(!settings.enable_delays);
    }
}
