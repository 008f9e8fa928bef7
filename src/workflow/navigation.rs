//! 登录与页面导航

use std::time::Duration;

use anyhow::{bail, Result};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::portal;
use crate::config::WebsiteConfig;
use crate::infrastructure::{LocatorChain, Session};

/// 打开首页并自动登录
///
/// 找不到输入框或登录按钮时返回错误，该任务无法继续
pub async fn login(session: &mut Session, website: &WebsiteConfig) -> Result<()> {
    let main = session.main_handle();
    session.focus(&main).await?;
    session.goto(&website.url).await?;

    info!("🔑 开始自动登录...");
    let username = portal::login_username();
    if !session.wait_for(&username, Some(Duration::from_secs(5))).await? {
        bail!("未找到用户名输入框");
    }

    let js = session.current()?;
    info!("输入用户名: {}", website.username);
    js.fill(&username, &website.username).await?;

    let password = portal::login_password();
    if !js.fill(&password, &website.password).await? {
        bail!("未找到密码输入框");
    }
    debug!("已输入密码");

    if !session.click(&portal::login_button()).await? {
        bail!("未找到登录按钮");
    }

    sleep(Duration::from_secs(3)).await;
    session.wait_for_page_load().await;

    let url = session.current_url().await.unwrap_or_default();
    info!("登录后地址: {}", url);
    if url.to_lowercase().contains("login") {
        warn!("⚠️ 登录状态未知，继续执行...");
    } else {
        info!("✓ 登录成功");
    }
    Ok(())
}

/// 点击导航链接；找不到时认为已在目标页面
async fn follow(session: &Session, link: &LocatorChain, name: &str) -> Result<()> {
    info!("正在查找'{}'...", name);
    if session.click(link).await? {
        session.wait_for_page_load().await;
        info!("✓ 已进入'{}'", name);
    } else {
        info!("未找到'{}'链接，可能已在该页面，继续...", name);
    }
    Ok(())
}

/// 我的课程 → 学习中
pub async fn to_courses(session: &Session) -> Result<()> {
    follow(session, &portal::course_list_link(), "我的课程").await?;

    let tab = portal::studying_tab();
    if session.wait_for(&tab, Some(Duration::from_secs(3))).await? {
        session.click(&tab).await?;
        session.wait_for_page_load().await;
        info!("✓ 已切换到'学习中'");
    } else {
        info!("未找到'学习中'标签，可能已经选中");
    }
    Ok(())
}

/// 我的作业
pub async fn to_homework(session: &Session) -> Result<()> {
    follow(session, &portal::homework_link(), "我的作业").await
}

/// 我的考试 → 未完成
pub async fn to_exams(session: &Session) -> Result<()> {
    follow(session, &portal::exam_link(), "我的考试").await?;

    let tab = portal::unfinished_exam_tab();
    if session.wait_for(&tab, Some(Duration::from_secs(3))).await? {
        session.click(&tab).await?;
        sleep(Duration::from_secs(2)).await;
        info!("✓ 已切换到'未完成'");
    }
    Ok(())
}
