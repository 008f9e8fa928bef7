//! 作业流程
//!
//! 作业列表 → 选出下一项 → 新窗口答题 → 提交 → 读分数 → 回到列表，直到没有可做的作业

use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::navigation;
use super::portal;
use crate::config::Config;
use crate::infrastructure::Session;
use crate::models::homework::{parse_score, RawHomeworkRow};
use crate::models::{HomeworkItem, Question, RawQuestion};
use crate::services::{select_next_item, AnswerResolver, AnswerStrategy, PageDumper, RandomStrategy};
use crate::utils::StopFlag;

/// 作业任务的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomeworkReport {
    /// 打开过的作业数
    pub attempted: usize,
    pub submitted: usize,
    /// 提交后分数达到及格线的作业数
    pub passed: usize,
    pub interrupted: bool,
}

impl HomeworkReport {
    pub fn summary(&self) -> String {
        format!(
            "处理 {} 项作业，提交 {} 项，其中 {} 项及格{}",
            self.attempted,
            self.submitted,
            self.passed,
            if self.interrupted { "（已中断）" } else { "" }
        )
    }
}

/// 一项作业的处理结果
enum Outcome {
    Submitted(Option<u32>),
    NotSubmitted,
}

/// 作业的随机策略：每题只选一项
pub fn random_resolver() -> AnswerResolver {
    AnswerResolver::Random(RandomStrategy::new().single_only())
}

/// 作业使用的答题策略
///
/// 开启 AI 时先做连通性测试，创建或测试失败都退回随机选择
pub async fn build_resolver(config: &Config) -> AnswerResolver {
    if !config.homework.use_ai {
        info!("🎲 作业使用随机选择答题");
        return random_resolver();
    }

    match AnswerResolver::from_config(&config.ai, true) {
        Ok(resolver) => match resolver.probe().await {
            Ok(()) => {
                info!("🤖 AI 连接正常 ({})", config.ai.provider.name());
                resolver
            }
            Err(e) => {
                warn!("⚠️ AI 连接测试失败，改用随机选择: {}", e);
                random_resolver()
            }
        },
        Err(e) => {
            warn!("⚠️ AI 初始化失败，改用随机选择: {}", e);
            random_resolver()
        }
    }
}

/// 读取作业列表
pub async fn read_items(session: &Session, passing_score: u32) -> Result<Vec<HomeworkItem>> {
    let rows: Option<Vec<RawHomeworkRow>> =
        session.current()?.eval_as(portal::HOMEWORK_ROWS_JS).await?;
    Ok(rows
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, raw)| HomeworkItem::from_raw(i, raw, passing_score))
        .collect())
}

/// 作业任务
pub async fn run(
    session: &mut Session,
    config: &Config,
    resolver: &AnswerResolver,
    dumper: &PageDumper,
    stop: &StopFlag,
) -> Result<HomeworkReport> {
    let passing = config.homework.min_passing_score;
    let mut report = HomeworkReport::default();

    let main = session.main_handle();
    session.focus(&main).await?;
    navigation::to_homework(session).await?;

    for round in 1..=portal::MAX_HOMEWORK_ITEMS {
        if stop.is_stopped() {
            info!("⏹️ 收到停止信号，结束作业任务");
            report.interrupted = true;
            break;
        }

        let items = read_items(session, passing).await?;
        if items.is_empty() {
            warn!("未找到作业列表");
            break;
        }
        for item in &items {
            debug!(
                "作业: {} [{}] 分数: {:?}",
                item.name,
                item.status.label(),
                item.score
            );
        }

        let Some(item) =
            select_next_item(&items, passing, config.homework.retry_if_failed).cloned()
        else {
            info!("🎉 没有需要完成的作业了");
            break;
        };

        info!("{}", "=".repeat(60));
        info!("📝 第 {} 项作业: {} ({})", round, item.name, item.status.label());
        info!("{}", "=".repeat(60));
        report.attempted += 1;

        let Some(tab) = session
            .capture_new_tab(&portal::click_homework_js(item.position))
            .await?
        else {
            warn!("⚠️ 点击作业按钮后没有打开新窗口");
            break;
        };
        session.focus(&tab).await?;
        session.wait_for_page_load().await;

        let outcome = complete_one(session, config, resolver, dumper, &item).await;

        if let Err(e) = session.close_tab(&tab).await {
            debug!("关闭作业窗口失败: {}", e);
        }
        session.focus(&main).await?;
        session.reload().await?;
        session.wait_for_page_load().await;
        navigation::to_homework(session).await?;

        match outcome {
            Ok(Outcome::Submitted(score)) => {
                report.submitted += 1;
                match score {
                    Some(s) if s >= passing => {
                        report.passed += 1;
                        info!("✅ {} 得分 {}，已及格", item.name, s);
                    }
                    Some(s) => info!("❌ {} 得分 {}，未达到 {} 分", item.name, s, passing),
                    None => warn!("⚠️ 未能读取 {} 的分数", item.name),
                }
            }
            Ok(Outcome::NotSubmitted) => {
                info!("作业未提交，停止作业任务");
                break;
            }
            Err(e) => {
                warn!("❌ 作业 {} 处理失败: {}", item.name, e);
                break;
            }
        }
    }

    info!("📊 {}", report.summary());
    Ok(report)
}

/// 在当前窗口完成一项作业
async fn complete_one(
    session: &Session,
    config: &Config,
    resolver: &AnswerResolver,
    dumper: &PageDumper,
    item: &HomeworkItem,
) -> Result<Outcome> {
    let js = session.current()?;

    if !session
        .wait_for(&portal::homework_container(), Some(Duration::from_secs(10)))
        .await?
    {
        dumper.dump(js.page(), "homework_page").await;
        bail!("未找到作业容器");
    }

    let rows: Option<Vec<RawQuestion>> = js.eval_as(portal::HOMEWORK_QUESTIONS_JS).await?;
    let questions = RawQuestion::into_questions(rows.unwrap_or_default());
    if questions.is_empty() {
        dumper.dump(js.page(), "homework_source").await;
        bail!("未找到题目");
    }
    info!("共 {} 道题，使用{}答题", questions.len(), resolver.name());

    let mut answered = 0;
    for question in &questions {
        if answer_question(session, resolver, question).await? {
            answered += 1;
        }
        sleep(Duration::from_secs(1)).await;
    }
    info!("已作答 {}/{} 道题", answered, questions.len());

    if !config.homework.auto_submit && !confirm_submit(&item.name).await {
        return Ok(Outcome::NotSubmitted);
    }

    if !session.click(&portal::homework_submit()).await? {
        bail!("未找到提交作业按钮");
    }
    info!("✓ 作业已提交，等待评分...");

    sleep(Duration::from_secs(5)).await;
    session.reload().await?;
    sleep(Duration::from_secs(3)).await;
    session.wait_for_page_load().await;

    let text: Option<String> = js.eval_as(portal::HOMEWORK_SCORE_JS).await?;
    debug!("分数记录: {:?}", text);
    Ok(Outcome::Submitted(text.as_deref().and_then(parse_score)))
}

/// 回答一道题，跳过时返回 false
async fn answer_question(
    session: &Session,
    resolver: &AnswerResolver,
    question: &Question,
) -> Result<bool> {
    if question.options.is_empty() {
        warn!("第 {} 题没有选项，跳过", question.index);
        return Ok(false);
    }

    let answer = match resolver.resolve(question).await {
        Ok(Some(answer)) => answer,
        Ok(None) => {
            warn!("第 {} 题没有得到答案，跳过", question.index);
            return Ok(false);
        }
        Err(e) => {
            warn!("第 {} 题获取答案失败，跳过: {}", question.index, e);
            return Ok(false);
        }
    };

    let picks = option_picks(question, answer.letters());
    let js = session.current()?;
    for &option in &picks {
        let clicked: Option<bool> = js
            .eval_as(portal::select_homework_option_js(question.index - 1, option))
            .await?;
        if !clicked.unwrap_or(false) {
            warn!("第 {} 题的第 {} 个选项点击失败", question.index, option + 1);
        }
    }
    info!(
        "第 {} 题 [{}] 选择: {}",
        question.index,
        question.kind.label(),
        answer
    );
    Ok(true)
}

/// 答案字母 → 要点击的选项下标
///
/// 非多选题只取第一个字母；一个都对不上时选第一个选项
pub fn option_picks(question: &Question, letters: &[char]) -> Vec<usize> {
    let mut picks: Vec<usize> = letters
        .iter()
        .filter_map(|&c| question.option_index(c))
        .collect();
    if !question.kind.is_multi() {
        picks.truncate(1);
    }
    if picks.is_empty() && !question.options.is_empty() {
        warn!(
            "第 {} 题的答案 {:?} 不在选项 {:?} 中，选择第一个选项",
            question.index,
            letters,
            question.labels()
        );
        picks.push(0);
    }
    picks
}

/// 关闭自动提交时在终端询问
async fn confirm_submit(name: &str) -> bool {
    let prompt = format!("是否提交作业「{}」？(y/n): ", name);
    let line = tokio::task::spawn_blocking(move || {
        print!("{}", prompt);
        std::io::stdout().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await;

    match line {
        Ok(Ok(line)) => is_yes(&line),
        _ => false,
    }
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes" | "是")
}
