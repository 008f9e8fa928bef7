use anyhow::Result;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig as CdpBrowserConfig};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::config::{AutomationConfig, BrowserConfig};
use crate::error::BrowserError;

/// 启动参数
///
/// 容器和低内存环境下需要关闭沙盒和 /dev/shm；
/// 关闭 AutomationControlled 后页面读不到 `navigator.webdriver`
const STABILITY_ARGS: [&str; 4] = [
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-blink-features=AutomationControlled",
];

/// 根据配置构建 chromiumoxide 的启动配置
pub fn build_launch_config(browser: &BrowserConfig) -> Result<CdpBrowserConfig, BrowserError> {
    let mut builder = CdpBrowserConfig::builder()
        .with_head()
        .window_size(browser.window_width, browser.window_height)
        .viewport(Viewport {
            width: browser.window_width,
            height: browser.window_height,
            device_scale_factor: Some(1.0),
            ..Default::default()
        })
        .args(STABILITY_ARGS.to_vec());

    if browser.headless {
        builder = builder.arg("--headless=new");
    }

    if let Some(ref path) = browser.chrome_executable {
        builder = builder.chrome_executable(path);
    }

    builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        BrowserError::Configuration(e)
    })
}

/// 启动浏览器，失败按配置的次数和间隔重试
///
/// # 返回
/// 返回浏览器和第一个空白页面
pub async fn launch_browser(
    browser: &BrowserConfig,
    automation: &AutomationConfig,
) -> Result<(Browser, chromiumoxide::Page)> {
    info!("🚀 启动浏览器...");
    debug!(
        "窗口 {}x{}, 无头模式: {}",
        browser.window_width, browser.window_height, browser.headless
    );

    let attempts = automation.launch_retries.max(1);
    let backoff = Duration::from_secs(automation.launch_backoff_secs);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match try_launch(browser).await {
            Ok(pair) => {
                info!("✅ 浏览器启动成功");
                return Ok(pair);
            }
            Err(e) => {
                warn!("浏览器启动失败 (第 {}/{} 次): {}", attempt, attempts, e);
                last_error = e.to_string();
                if attempt < attempts {
                    sleep(backoff).await;
                }
            }
        }
    }

    Err(BrowserError::LaunchExhausted {
        attempts,
        last_error,
    }
    .into())
}

async fn try_launch(browser: &BrowserConfig) -> Result<(Browser, chromiumoxide::Page)> {
    let config = build_launch_config(browser)?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;

    Ok((browser, page))
}
