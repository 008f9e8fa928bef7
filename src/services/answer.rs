//! 答案生成 - 业务能力层
//!
//! 两种可互换的策略：随机选择 / 远程 LLM 推理

use std::sync::Mutex;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use regex::Regex;
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::error::LlmError;
use crate::models::{Answer, Question};
use crate::services::llm_service::LlmService;
use crate::utils::logging::truncate_text;

/// 系统消息
const SYSTEM_MESSAGE: &str = "你是一位知识渊博的AI助手，擅长回答各类问题。";

/// 多选题附加的要求
const MULTI_INSTRUCTION: &str = "这是多选题，请返回所有正确答案的字母，用逗号分隔（如：A,C,D）";

/// 答题策略
#[allow(async_fn_in_trait)]
pub trait AnswerStrategy {
    fn name(&self) -> &'static str;

    /// 返回 `Ok(None)` 表示明确"没有答案"，`Err` 表示调用失败
    async fn resolve(&self, question: &Question) -> Result<Option<Answer>>;
}

/// 随机选择
pub struct RandomStrategy {
    rng: Mutex<StdRng>,
    /// 多选题随机选 2-3 项；关闭时所有题型都只选一项
    multi: bool,
}

impl RandomStrategy {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            multi: true,
        }
    }

    /// 固定种子，测试用
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            multi: true,
        }
    }

    /// 作业用：多选题也只随机选一项
    pub fn single_only(mut self) -> Self {
        self.multi = false;
        self
    }

    /// 从题目中选出答案（同步，不跨 await 持锁）
    pub fn pick(&self, question: &Question) -> Option<Answer> {
        let count = question.options.len();
        if count == 0 {
            return None;
        }
        let indices: Vec<usize> = (0..count).collect();
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let chosen: Vec<usize> = if self.multi && question.kind.is_multi() && count >= 2 {
            let n = rng.gen_range(2..=count.min(3));
            indices.choose_multiple(&mut *rng, n).copied().collect()
        } else {
            indices.choose(&mut *rng).copied().into_iter().collect()
        };

        Answer::from_letters(chosen.into_iter().map(|i| option_letter(question, i)))
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerStrategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "随机"
    }

    async fn resolve(&self, question: &Question) -> Result<Option<Answer>> {
        Ok(self.pick(question))
    }
}

/// 远程 LLM 推理
pub struct RemoteStrategy {
    llm: LlmService,
}

impl RemoteStrategy {
    pub fn new(llm: LlmService) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &LlmService {
        &self.llm
    }
}

impl AnswerStrategy for RemoteStrategy {
    fn name(&self) -> &'static str {
        "AI"
    }

    async fn resolve(&self, question: &Question) -> Result<Option<Answer>> {
        let prompt = build_prompt(question);
        debug!("第 {} 题提示词长度: {}", question.index, prompt.len());

        let response = self.llm.send_to_llm(&prompt, Some(SYSTEM_MESSAGE)).await?;
        let answer = parse_answer_letters(&response);
        if answer.is_none() {
            warn!(
                "⚠️ 未能从 AI 回答中提取答案: {}",
                truncate_text(&response, 50)
            );
        }
        Ok(answer)
    }
}

/// 按配置选定的策略
pub enum AnswerResolver {
    Random(RandomStrategy),
    Remote(RemoteStrategy),
}

impl AnswerResolver {
    /// `use_ai` 为真时使用配置的 LLM 后端，否则随机选择
    pub fn from_config(ai: &AiConfig, use_ai: bool) -> Result<Self, LlmError> {
        if use_ai {
            Ok(AnswerResolver::Remote(RemoteStrategy::new(LlmService::new(ai)?)))
        } else {
            Ok(AnswerResolver::Random(RandomStrategy::new()))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, AnswerResolver::Remote(_))
    }

    /// 远程策略做一次连通性测试，随机策略总是成功
    pub async fn probe(&self) -> Result<()> {
        match self {
            AnswerResolver::Random(_) => Ok(()),
            AnswerResolver::Remote(remote) => remote.llm().probe().await.map(|_| ()),
        }
    }
}

impl AnswerStrategy for AnswerResolver {
    fn name(&self) -> &'static str {
        match self {
            AnswerResolver::Random(s) => s.name(),
            AnswerResolver::Remote(s) => s.name(),
        }
    }

    async fn resolve(&self, question: &Question) -> Result<Option<Answer>> {
        match self {
            AnswerResolver::Random(s) => s.resolve(question).await,
            AnswerResolver::Remote(s) => s.resolve(question).await,
        }
    }
}

/// 选项的字母：取标签首字母，标签里没有字母时按位置推算
fn option_letter(question: &Question, index: usize) -> char {
    question.options[index]
        .label
        .trim()
        .chars()
        .next()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or((b'A' + (index as u8 % 26)) as char)
}

/// 把题目渲染成提示词
pub fn build_prompt(question: &Question) -> String {
    let mut body = question.title.trim().to_string();
    if !question.options.is_empty() {
        body.push_str("\n\n选项:\n");
        for (i, option) in question.options.iter().enumerate() {
            body.push_str(&format!(
                "{}. {}\n",
                option_letter(question, i),
                option.text.trim()
            ));
        }
    }
    if question.kind.is_multi() {
        body.push('\n');
        body.push_str(MULTI_INSTRUCTION);
    }

    let requirement = if question.kind.is_multi() {
        "2. 返回所有正确选项的字母,用逗号分隔"
    } else {
        "2. 只返回一个选项字母(如A、B、C、D等)"
    };

    format!(
        "你是一位知识渊博的大学教授。请仔细分析以下题目,并给出正确答案。\n\n{}\n\n要求:\n1. 认真思考题目,给出准确答案\n{}\n3. 不要有任何解释,只返回字母\n\n答案:",
        body, requirement
    )
}

/// 取回答中第一段答案字母，大写并去重
///
/// 答案字母是单独成词的字母（可用空白、逗号、顿号分隔，如 `A, C`），
/// 或连写的大写字母串（如 `ABD`）；普通英文单词不算。
/// 没有答案字母时返回 None
pub fn parse_answer_letters(response: &str) -> Option<Answer> {
    let tokens =
        Regex::new(r"(?-u:\b)[A-Za-z](?-u:\b)(?:[\s,，、]*(?-u:\b)[A-Za-z](?-u:\b))*").ok()?;
    let joined = Regex::new(r"(?-u:\b)[A-Z]{2,}(?-u:\b)").ok()?;

    let run = match (tokens.find(response), joined.find(response)) {
        (Some(a), Some(b)) => {
            if a.start() <= b.start() {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Answer::from_letters(run.as_str().chars())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionOption;

    fn question(title: &str, labels: &[&str]) -> Question {
        let options = labels
            .iter()
            .map(|l| QuestionOption {
                label: l.to_string(),
                text: format!("内容{}", l),
            })
            .collect();
        Question::new(1, title, options)
    }

    #[test]
    fn test_parse_single_letter() {
        assert_eq!(parse_answer_letters("B").unwrap().to_string(), "B");
        assert_eq!(parse_answer_letters("答案是 c。").unwrap().to_string(), "C");
    }

    #[test]
    fn test_parse_multi_letters() {
        assert_eq!(parse_answer_letters("A,C,D").unwrap().to_string(), "A,C,D");
        assert_eq!(parse_answer_letters("A，C、D").unwrap().to_string(), "A,C,D");
        assert_eq!(parse_answer_letters("ABD").unwrap().to_string(), "A,B,D");
    }

    #[test]
    fn test_parse_first_run_only() {
        assert_eq!(parse_answer_letters("B。因为选项D错误").unwrap().to_string(), "B");
    }

    #[test]
    fn test_parse_ignores_english_words() {
        assert_eq!(parse_answer_letters("B is correct").unwrap().to_string(), "B");
        assert_eq!(parse_answer_letters("Answer: B").unwrap().to_string(), "B");
        assert_eq!(parse_answer_letters("The answer is A, C").unwrap().to_string(), "A,C");
        assert_eq!(parse_answer_letters("选B").unwrap().to_string(), "B");
        assert!(parse_answer_letters("No idea").is_none());
    }

    #[test]
    fn test_parse_dedup() {
        assert_eq!(parse_answer_letters("A, a, B").unwrap().to_string(), "A,B");
    }

    #[test]
    fn test_parse_no_letters_is_none() {
        assert!(parse_answer_letters("我不知道").is_none());
        assert!(parse_answer_letters("").is_none());
        assert!(parse_answer_letters("1, 2, 3").is_none());
    }

    #[test]
    fn test_random_single_returns_one_label() {
        let strategy = RandomStrategy::from_seed(7);
        let q = question("[单选题] 题目", &["A", "B", "C", "D"]);
        for _ in 0..50 {
            let answer = strategy.pick(&q).unwrap();
            assert!(answer.is_single());
            assert!(q.option_index(answer.letters()[0]).is_some());
        }
    }

    #[test]
    fn test_random_multi_picks_two_or_three_distinct() {
        let strategy = RandomStrategy::from_seed(11);
        let q = question("[多选题] 题目", &["A", "B", "C", "D", "E"]);
        for _ in 0..50 {
            let answer = strategy.pick(&q).unwrap();
            let n = answer.letters().len();
            assert!((2..=3).contains(&n));
        }
    }

    #[test]
    fn test_random_multi_with_two_options() {
        let strategy = RandomStrategy::from_seed(3);
        let q = question("[多选题] 题目", &["A", "B"]);
        assert_eq!(strategy.pick(&q).unwrap().to_string().len(), 3);
    }

    #[test]
    fn test_single_only_picks_one_for_multi() {
        let strategy = RandomStrategy::from_seed(1).single_only();
        let q = question("[多选题] 题目", &["A", "B", "C", "D"]);
        for _ in 0..50 {
            assert!(strategy.pick(&q).unwrap().is_single());
        }
    }

    #[test]
    fn test_random_without_options_is_none() {
        let strategy = RandomStrategy::from_seed(1);
        let q = question("[单选题] 题目", &[]);
        assert!(strategy.pick(&q).is_none());
    }

    #[test]
    fn test_prompt_contains_options_and_multi_hint() {
        let q = question("[多选题] 以下哪些是质数", &["A", "B", "C"]);
        let prompt = build_prompt(&q);
        assert!(prompt.contains("以下哪些是质数"));
        assert!(prompt.contains("A. 内容A"));
        assert!(prompt.contains("C. 内容C"));
        assert!(prompt.contains(MULTI_INSTRUCTION));
        assert!(prompt.ends_with("答案:"));

        let single = question("[单选题] 题目", &["A", "B"]);
        assert!(!build_prompt(&single).contains(MULTI_INSTRUCTION));
    }

    #[test]
    fn test_from_config() {
        let ai = AiConfig::default();
        assert!(!AnswerResolver::from_config(&ai, false).unwrap().is_remote());
        // 没有 API Key 时无法创建远程策略
        assert!(AnswerResolver::from_config(&ai, true).is_err());

        let ai = AiConfig {
            openai_api_key: "sk-test".to_string(),
            ..Default::default()
        };
        assert!(AnswerResolver::from_config(&ai, true).unwrap().is_remote());
    }

    #[test]
    fn test_resolve_random_via_trait() {
        let resolver = AnswerResolver::Random(RandomStrategy::from_seed(5));
        let q = question("[判断题] 地球是圆的", &["A", "B"]);
        let answer = tokio_test::block_on(resolver.resolve(&q)).unwrap();
        assert!(answer.is_some());
        assert_eq!(resolver.name(), "随机");
        assert!(!resolver.is_remote());
    }
}
