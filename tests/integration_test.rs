use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use anyhow::Result;
use auto_study::config::Config;
use auto_study::infrastructure::Session;
use auto_study::models::{HomeworkItem, ItemStatus, PageSignals, Question, QuestionOption, TabHandle};
use auto_study::services::answer::parse_answer_letters;
use auto_study::services::{select_next_item, AnswerResolver, LlmService, RandomStrategy};
use auto_study::utils::{logging, StopFlag};
use auto_study::workflow::{is_completed, navigation, CompletionPoller, PollerSettings, TabDriver};

/// 每个窗口按脚本完成课时：`units[i]` 表示第 i 个课时需要几次检测才完成
struct ScriptedTab {
    units: VecDeque<u32>,
    polls: u32,
}

#[derive(Default)]
struct ScriptedDriver {
    focused: Option<TabHandle>,
    tabs: HashMap<TabHandle, ScriptedTab>,
    next_clicks: HashMap<TabHandle, u32>,
    probes: u32,
}

impl ScriptedDriver {
    fn with_tabs(script: &[(&str, &[u32])]) -> Self {
        let mut driver = Self::default();
        for (name, units) in script {
            driver.tabs.insert(
                TabHandle::new(*name),
                ScriptedTab {
                    units: units.iter().copied().collect(),
                    polls: 0,
                },
            );
        }
        driver
    }

    fn clicks(&self, name: &str) -> u32 {
        self.next_clicks
            .get(&TabHandle::new(name))
            .copied()
            .unwrap_or(0)
    }
}

impl TabDriver for ScriptedDriver {
    async fn focus(&mut self, handle: &TabHandle) -> Result<()> {
        self.focused = Some(handle.clone());
        Ok(())
    }

    async fn probe(&mut self, handle: &TabHandle) -> Result<PageSignals> {
        assert_eq!(self.focused.as_ref(), Some(handle), "探测前必须先切换窗口");
        self.probes += 1;
        let tab = self.tabs.get_mut(handle).expect("未知窗口");
        tab.polls += 1;
        let done = tab.units.front().map(|&n| tab.polls >= n).unwrap_or(false);
        Ok(PageSignals {
            popup_style: Some(if done { "display: block;" } else { "display: none;" }.to_string()),
            ..Default::default()
        })
    }

    async fn click_next(&mut self, handle: &TabHandle) -> Result<bool> {
        let tab = self.tabs.get_mut(handle).expect("未知窗口");
        if tab.units.len() <= 1 {
            return Ok(false);
        }
        tab.units.pop_front();
        tab.polls = 0;
        *self.next_clicks.entry(handle.clone()).or_default() += 1;
        Ok(true)
    }

    async fn open_next_from_course_list(&mut self, _handle: &TabHandle) -> Result<bool> {
        Ok(false)
    }

    async fn apply_speed(&mut self, _handle: &TabHandle) -> Result<()> {
        Ok(())
    }

    async fn restore_focus(&mut self) -> Result<()> {
        self.focused = None;
        Ok(())
    }
}

#[tokio::test]
async fn test_poller_three_targets_end_to_end() {
    let mut driver = ScriptedDriver::with_tabs(&[("A", &[1]), ("B", &[2, 1]), ("C", &[3])]);
    let poller = CompletionPoller::new(PollerSettings {
        interval: Duration::ZERO,
        tick: Duration::ZERO,
        stuck_after: 1,
    });

    let handles = vec![TabHandle::new("A"), TabHandle::new("B"), TabHandle::new("C")];
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        poller.run(&mut driver, handles, &StopFlag::new()),
    )
    .await
    .expect("轮询应该在所有窗口完成后结束");

    assert_eq!(driver.clicks("A"), 0);
    assert_eq!(driver.clicks("B"), 1);
    assert_eq!(driver.clicks("C"), 0);
    assert_eq!(report.units_completed, 4);
    assert_eq!(report.targets_completed, 3);
    assert_eq!(report.targets_stuck, 0);
    assert!(!report.interrupted);
    // A:1 + B:2+1 + C:3
    assert_eq!(driver.probes, 7);
    assert!(driver.focused.is_none());
}

fn item(position: usize, status: ItemStatus, score: Option<u32>) -> HomeworkItem {
    HomeworkItem {
        position,
        name: format!("作业{}", position + 1),
        score,
        status,
    }
}

#[test]
fn test_selector_prefers_unstarted_over_low_score() {
    let items = vec![
        item(0, ItemStatus::NeedsRetry, Some(20)),
        item(1, ItemStatus::Passed, Some(90)),
        item(2, ItemStatus::NotStarted, None),
    ];
    assert_eq!(select_next_item(&items, 60, true).map(|i| i.position), Some(2));
}

#[test]
fn test_selector_nothing_to_do_without_retry() {
    let items = vec![
        item(0, ItemStatus::NeedsRetry, Some(20)),
        item(1, ItemStatus::InProgress, None),
    ];
    assert!(select_next_item(&items, 60, false).is_none());
    assert_eq!(select_next_item(&items, 60, true).map(|i| i.position), Some(0));
}

#[test]
fn test_random_single_choice_in_range() {
    let strategy = RandomStrategy::from_seed(42);
    let options: Vec<QuestionOption> = ["A", "B", "C"]
        .iter()
        .map(|l| QuestionOption {
            label: l.to_string(),
            text: String::new(),
        })
        .collect();
    let question = Question::new(1, "[单选题] 以下正确的是", options);

    for _ in 0..100 {
        let answer = strategy.pick(&question).expect("有选项时一定有答案");
        assert!(answer.is_single());
        assert!(question.labels().contains(&answer.letters()[0].to_string()));
    }
}

#[test]
fn test_answer_without_letters_is_no_answer() {
    assert!(parse_answer_letters("抱歉，我无法回答").is_none());
    assert_eq!(parse_answer_letters(" b ").unwrap().to_string(), "B");
}

#[test]
fn test_completion_predicate_any_check() {
    assert!(!is_completed(&PageSignals::default()));
    assert!(is_completed(&PageSignals {
        tip_text: Some("本课时已学完".to_string()),
        ..Default::default()
    }));
    assert!(is_completed(&PageSignals {
        next_visible: true,
        ..Default::default()
    }));
}

#[tokio::test]
#[ignore] // 需要 config.toml 和本机 Chrome：cargo test -- --ignored
async fn test_launch_and_login() {
    logging::init();
    let config = Config::load("config.toml").expect("加载配置失败");

    let mut session = Session::launch(&config).await.expect("启动浏览器失败");
    navigation::login(&mut session, &config.website)
        .await
        .expect("登录失败");

    let url = session.current_url().await.expect("读取地址失败");
    assert!(!url.is_empty());
}

#[tokio::test]
#[ignore] // 需要 config.toml 和本机 Chrome
async fn test_goto_unreachable_url_keeps_going() {
    logging::init();
    let mut config = Config::load("config.toml").expect("加载配置失败");
    config.automation.page_load_timeout = 3;

    let session = Session::launch(&config).await.expect("启动浏览器失败");
    // 9 号端口没有服务，导航失败后仍应返回 Ok，任务继续
    session
        .goto("http://127.0.0.1:9/")
        .await
        .expect("导航失败不应中止任务");
    assert!(session.current().is_ok());
}

#[tokio::test]
#[ignore] // 需要有效的 API Key
async fn test_llm_probe() {
    logging::init();
    let config = Config::load("config.toml").expect("加载配置失败");

    let llm = LlmService::new(&config.ai).expect("创建 LLM 服务失败");
    llm.probe().await.expect("AI 连接测试失败");

    let resolver = AnswerResolver::from_config(&config.ai, true).expect("创建答题策略失败");
    assert!(resolver.is_remote());
}
