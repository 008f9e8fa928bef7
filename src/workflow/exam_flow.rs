//! 考试流程
//!
//! 每轮只处理"未完成"列表中的第一项考试：开始 → 逐题作答 → 交卷 → 回首页。
//! AI 出错时整个考试任务中止，不会带着空题交卷。

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::navigation;
use super::portal;
use crate::config::Config;
use crate::infrastructure::session::random_duration;
use crate::infrastructure::Session;
use crate::models::exam::RawExamRow;
use crate::models::{Answer, ExamEntry, Question, QuestionKind, RawQuestion, TabHandle};
use crate::services::{AnswerResolver, AnswerStrategy, PageDumper};
use crate::utils::StopFlag;

/// 考试任务的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamReport {
    pub attempted: usize,
    pub submitted: usize,
    pub interrupted: bool,
}

impl ExamReport {
    pub fn summary(&self) -> String {
        format!(
            "开始 {} 场考试，交卷 {} 场{}",
            self.attempted,
            self.submitted,
            if self.interrupted { "（已中断）" } else { "" }
        )
    }
}

/// 考试使用的答题策略
///
/// 开启 AI 时连通性测试必须通过，否则不开始考试
pub async fn build_resolver(config: &Config) -> Result<AnswerResolver> {
    let resolver = AnswerResolver::from_config(&config.ai, config.homework.use_ai)?;
    if resolver.is_remote() {
        info!("正在测试 AI 连接...");
        resolver
            .probe()
            .await
            .context("AI 连接测试失败，请检查 AI 配置后重新运行")?;
        info!("🤖 AI 连接正常 ({})", config.ai.provider.name());
    } else {
        info!("🎲 考试使用随机选择答题");
    }
    Ok(resolver)
}

/// 读取"未完成"标签下的考试
pub async fn read_exams(session: &Session) -> Result<Vec<ExamEntry>> {
    let rows: Option<Vec<RawExamRow>> = session.current()?.eval_as(portal::EXAM_ROWS_JS).await?;
    let exams: Vec<ExamEntry> = rows
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, raw)| ExamEntry::from_raw(i, raw))
        .filter(ExamEntry::is_pending)
        .collect();
    for exam in &exams {
        debug!("  - {} [{}]", exam.name, exam.status_label());
    }
    Ok(exams)
}

/// 考试任务
pub async fn run(
    session: &mut Session,
    config: &Config,
    resolver: &AnswerResolver,
    dumper: &PageDumper,
    stop: &StopFlag,
) -> Result<ExamReport> {
    let mut report = ExamReport::default();
    let main = session.main_handle();

    for round in 1..=portal::MAX_EXAMS {
        if stop.is_stopped() {
            info!("⏹️ 收到停止信号，结束考试任务");
            report.interrupted = true;
            break;
        }

        session.focus(&main).await?;
        navigation::to_exams(session).await?;

        let exams = read_exams(session).await?;
        let Some(exam) = exams.first() else {
            info!("🎉 没有更多未完成的考试");
            break;
        };

        info!("{}", "=".repeat(60));
        info!(
            "📋 第 {} 场考试: {} (剩余 {} 场)",
            round,
            exam.name,
            exams.len()
        );
        info!("{}", "=".repeat(60));
        report.attempted += 1;

        let tab = match start_exam(session, exam).await {
            Ok(tab) => tab,
            Err(e) => {
                warn!("❌ 开始考试失败: {}", e);
                break;
            }
        };
        if let Some(tab) = &tab {
            session.focus(tab).await?;
            session.wait_for_page_load().await;
        } else {
            info!("考试在当前窗口打开");
        }

        answer_exam(session, config, resolver, dumper).await?;

        if !config.homework.auto_submit {
            info!("配置为不自动提交，请手动交卷");
            break;
        }
        if !submit_exam(session).await? {
            warn!("❌ 第 {} 场考试交卷失败", round);
            break;
        }
        report.submitted += 1;
        info!("✅ 第 {} 场考试已交卷", round);

        return_home(session, config, tab.as_ref()).await?;
        sleep(Duration::from_secs(2)).await;
    }

    info!("📊 {}", report.summary());
    Ok(report)
}

/// 通过下拉菜单开始考试，菜单不可用时点主按钮
///
/// # 返回
/// 考试打开的新窗口；在当前窗口打开时为 None
async fn start_exam(session: &mut Session, exam: &ExamEntry) -> Result<Option<TabHandle>> {
    let js = session.current()?;

    let opened: Option<bool> = js
        .eval_as(portal::open_exam_dropdown_js(exam.position))
        .await?;
    let action = if opened.unwrap_or(false) {
        debug!("已打开下拉菜单");
        sleep(Duration::from_millis(500)).await;
        let has_start: Option<bool> = js
            .eval_as("Array.from(document.querySelectorAll('.el-dropdown-menu__item')).some(b => (b.innerText || '').includes('开始考试'))")
            .await?;
        if has_start.unwrap_or(false) {
            portal::CLICK_START_EXAM_JS.to_string()
        } else {
            warn!("下拉菜单中没有'开始考试'，改为点击操作按钮");
            portal::click_exam_primary_js(exam.position)
        }
    } else {
        warn!("未找到下拉菜单按钮，改为点击操作按钮");
        portal::click_exam_primary_js(exam.position)
    };

    let tab = session.capture_new_tab(&action).await?;
    sleep(Duration::from_millis(1500)).await;
    Ok(tab)
}

/// 逐题作答，AI 出错时返回错误
async fn answer_exam(
    session: &Session,
    config: &Config,
    resolver: &AnswerResolver,
    dumper: &PageDumper,
) -> Result<()> {
    let js = session.current()?;
    sleep(Duration::from_secs(1)).await;

    if !session.wait_for(&portal::exam_question(), None).await? {
        dumper.dump(js.page(), "exam_page").await;
        bail!("未找到考试题目");
    }

    let rows: Option<Vec<RawQuestion>> = js.eval_as(portal::EXAM_QUESTIONS_JS).await?;
    let questions = RawQuestion::into_questions(rows.unwrap_or_default());
    if questions.is_empty() {
        dumper.dump(js.page(), "exam_source").await;
        bail!("未能读取考试题目");
    }
    info!("共有 {} 道题目，使用{}答题", questions.len(), resolver.name());

    let mut answered = 0;
    for question in &questions {
        if question.kind == QuestionKind::Unknown {
            info!("第 {} 题题型未知，跳过", question.index);
            continue;
        }
        if question.options.is_empty() {
            warn!("第 {} 题未找到选项", question.index);
            continue;
        }

        let Some(answer) = resolve_fail_closed(resolver, resolver.is_remote(), question).await?
        else {
            warn!("第 {} 题没有得到答案，跳过", question.index);
            continue;
        };

        for option in exam_picks(question, &answer) {
            let clicked: Option<bool> = js
                .eval_as(portal::click_exam_option_js(question.index - 1, option))
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
        answered += 1;

        sleep(random_duration(
            config.exam.answer_delay_min,
            config.exam.answer_delay_max,
        ))
        .await;
    }

    info!("{}", "=".repeat(60));
    info!("答题完成: {}/{}", answered, questions.len());
    info!("{}", "=".repeat(60));
    Ok(())
}

/// 远程策略的错误和"没有答案"都会中止考试；随机策略没有答案时只跳过该题
async fn resolve_fail_closed<S: AnswerStrategy>(
    strategy: &S,
    remote: bool,
    question: &Question,
) -> Result<Option<Answer>> {
    let answer = strategy
        .resolve(question)
        .await
        .with_context(|| format!("第 {} 题 AI 调用失败，考试任务终止", question.index))?;
    if answer.is_none() && remote {
        bail!("第 {} 题 AI 未给出答案，考试任务终止", question.index);
    }
    Ok(answer)
}

/// 答案字母 → 要点击的选项下标，不在选项范围内的字母忽略
pub fn exam_picks(question: &Question, answer: &Answer) -> Vec<usize> {
    let letters = if question.kind.is_multi() {
        answer.letters()
    } else {
        &answer.letters()[..1]
    };
    letters
        .iter()
        .filter_map(|&c| question.option_index(c))
        .collect()
}

/// 点击交卷，有确认对话框时确认
async fn submit_exam(session: &Session) -> Result<bool> {
    info!("准备交卷...");
    if !session.click(&portal::exam_submit()).await? {
        warn!("未找到交卷按钮");
        return Ok(false);
    }
    sleep(Duration::from_secs(2)).await;

    let confirm = portal::exam_confirm();
    if session.wait_for(&confirm, Some(Duration::from_secs(5))).await? {
        session.click(&confirm).await?;
        info!("✓ 考试已提交");
    } else {
        info!("✓ 考试已提交（无需确认）");
    }
    sleep(Duration::from_secs(3)).await;
    Ok(true)
}

/// 关闭考试窗口并回到首页
async fn return_home(session: &mut Session, config: &Config, tab: Option<&TabHandle>) -> Result<()> {
    if let Some(tab) = tab {
        if let Err(e) = session.close_tab(tab).await {
            debug!("关闭考试窗口失败: {}", e);
        }
    }
    let main = session.main_handle();
    session.focus(&main).await?;
    session.goto(&config.website.url).await?;
    session.wait_for_page_load().await;
    info!("已返回首页");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionOption;
    use crate::services::RandomStrategy;

    fn question(title: &str, count: usize) -> Question {
        let options = (0..count)
            .map(|i| QuestionOption {
                label: ((b'A' + i as u8) as char).to_string(),
                text: format!("选项{}", i + 1),
            })
            .collect();
        Question::new(1, title, options)
    }

    fn answer(letters: &str) -> Answer {
        Answer::from_letters(letters.chars()).unwrap()
    }

    #[test]
    fn test_single_uses_first_letter_only() {
        let q = question("[单选题] 题目", 4);
        assert_eq!(exam_picks(&q, &answer("BD")), vec![1]);
    }

    #[test]
    fn test_out_of_range_letters_are_ignored() {
        let q = question("[多选题] 题目", 3);
        assert_eq!(exam_picks(&q, &answer("AEC")), vec![0, 2]);

        let judge = question("[判断题] 题目", 2);
        assert!(exam_picks(&judge, &answer("F")).is_empty());
    }

    /// 模拟远程接口的固定回复
    enum Scripted {
        Fails,
        Silent,
        Says(&'static str),
    }

    impl AnswerStrategy for Scripted {
        fn name(&self) -> &'static str {
            "AI"
        }

        async fn resolve(&self, _question: &Question) -> Result<Option<Answer>> {
            match self {
                Scripted::Fails => bail!("连接超时"),
                Scripted::Silent => Ok(None),
                Scripted::Says(letters) => Ok(Answer::from_letters(letters.chars())),
            }
        }
    }

    #[tokio::test]
    async fn test_random_strategy_never_aborts() {
        let resolver = AnswerResolver::Random(RandomStrategy::from_seed(9));
        let q = question("[多选题] 题目", 4);
        let picked = resolve_fail_closed(&resolver, resolver.is_remote(), &q)
            .await
            .unwrap()
            .unwrap();
        assert!((2..=3).contains(&picked.letters().len()));

        let empty = question("[单选题] 题目", 0);
        assert!(resolve_fail_closed(&resolver, false, &empty)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remote_error_aborts_exam() {
        let q = question("[单选题] 题目", 4);
        let err = resolve_fail_closed(&Scripted::Fails, true, &q)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("考试任务终止"));
    }

    #[tokio::test]
    async fn test_remote_no_answer_aborts_exam() {
        let q = question("[单选题] 题目", 4);
        assert!(resolve_fail_closed(&Scripted::Silent, true, &q).await.is_err());
        // 同样的"没有答案"来自随机策略时只跳过该题
        assert!(resolve_fail_closed(&Scripted::Silent, false, &q)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remote_answer_passes_through() {
        let q = question("[多选题] 题目", 4);
        let answer = resolve_fail_closed(&Scripted::Says("AC"), true, &q)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exam_picks(&q, &answer), vec![0, 2]);
    }

    #[test]
    fn test_report_summary() {
        let report = ExamReport {
            attempted: 2,
            submitted: 1,
            interrupted: false,
        };
        assert_eq!(report.summary(), "开始 2 场考试，交卷 1 场");
    }
}
