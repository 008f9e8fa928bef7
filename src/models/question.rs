//! 题目与答案

use std::fmt;

use serde::{Deserialize, Serialize};

/// 题型，由题干中的标记判断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    Single,
    Multi,
    Judge,
    Unknown,
}

impl QuestionKind {
    /// 根据题干标记识别题型，`[多选题]` 优先
    pub fn detect(title: &str) -> Self {
        if title.contains("[多选题]") || title.contains("【多选题】") {
            QuestionKind::Multi
        } else if title.contains("[判断题]") || title.contains("【判断题】") {
            QuestionKind::Judge
        } else if title.contains("[单选题]") || title.contains("【单选题】") {
            QuestionKind::Single
        } else {
            QuestionKind::Unknown
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, QuestionKind::Multi)
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::Single => "单选题",
            QuestionKind::Multi => "多选题",
            QuestionKind::Judge => "判断题",
            QuestionKind::Unknown => "未知题型",
        }
    }
}

/// 选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// 选项字母，如 "A"
    pub label: String,
    pub text: String,
}

/// 页面上的一道题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// 题号（从 1 开始）
    pub index: usize,
    pub kind: QuestionKind,
    pub title: String,
    pub options: Vec<QuestionOption>,
}

impl Question {
    pub fn new(index: usize, title: impl Into<String>, options: Vec<QuestionOption>) -> Self {
        let title = title.into();
        Self {
            index,
            kind: QuestionKind::detect(&title),
            title,
            options,
        }
    }

    /// 选项字母列表
    pub fn labels(&self) -> Vec<String> {
        self.options.iter().map(|o| o.label.clone()).collect()
    }

    /// 字母 → 选项下标，没有该选项时返回 None
    pub fn option_index(&self, letter: char) -> Option<usize> {
        self.options.iter().position(|o| {
            o.label
                .trim()
                .chars()
                .next()
                .map(|c| c.eq_ignore_ascii_case(&letter))
                .unwrap_or(false)
        })
    }
}

/// 页面脚本读出的原始题目
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

impl RawQuestion {
    /// 按页面顺序编号（从 1 开始）
    pub fn into_questions(rows: Vec<RawQuestion>) -> Vec<Question> {
        rows.into_iter()
            .enumerate()
            .map(|(i, raw)| Question::new(i + 1, raw.title, raw.options))
            .collect()
    }
}

/// 答案：一个或多个大写字母
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    letters: Vec<char>,
}

impl Answer {
    /// 字母统一转大写并去重，保持出现顺序；没有字母时返回 None
    pub fn from_letters(letters: impl IntoIterator<Item = char>) -> Option<Self> {
        let mut out: Vec<char> = Vec::new();
        for c in letters {
            if !c.is_ascii_alphabetic() {
                continue;
            }
            let c = c.to_ascii_uppercase();
            if !out.contains(&c) {
                out.push(c);
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(Self { letters: out })
        }
    }

    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    pub fn is_single(&self) -> bool {
        self.letters.len() == 1
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.letters.iter().map(|c| c.to_string()).collect();
        f.write_str(&joined.join(","))
    }
}
