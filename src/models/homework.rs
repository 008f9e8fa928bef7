//! 作业/考试列表项

use regex::Regex;
use serde::{Deserialize, Serialize};

/// 作业状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    NotStarted,
    InProgress,
    Passed,
    NeedsRetry,
}

impl ItemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::NotStarted => "未开始",
            ItemStatus::InProgress => "进行中",
            ItemStatus::Passed => "已达标",
            ItemStatus::NeedsRetry => "需要重做",
        }
    }
}

/// 列表页上的一项作业，每次轮询重新读取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeworkItem {
    /// 在列表中的位置（0-based），点击按钮时用
    pub position: usize,
    pub name: String,
    pub score: Option<u32>,
    pub status: ItemStatus,
}

/// 页面脚本读出的原始文本
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHomeworkRow {
    pub name: String,
    pub button_text: String,
    #[serde(default)]
    pub status_text: String,
}

impl HomeworkItem {
    pub fn from_raw(position: usize, raw: &RawHomeworkRow, passing_score: u32) -> Self {
        let score = parse_score(&raw.status_text);
        Self {
            position,
            name: raw.name.trim().to_string(),
            score,
            status: classify(&raw.button_text, score, passing_score),
        }
    }

    /// 有分数且低于及格线
    pub fn is_below(&self, passing_score: u32) -> bool {
        matches!(self.score, Some(score) if score < passing_score)
    }
}

/// 从 "第2次 ( 45分 )" 之类的文字中取出分数
pub fn parse_score(text: &str) -> Option<u32> {
    let re = Regex::new(r"(\d+)分").ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// 按钮文字 + 分数 → 状态
pub fn classify(button_text: &str, score: Option<u32>, passing_score: u32) -> ItemStatus {
    if button_text.trim() == "开始作业" {
        return ItemStatus::NotStarted;
    }
    match score {
        Some(s) if s >= passing_score => ItemStatus::Passed,
        Some(_) => ItemStatus::NeedsRetry,
        None => ItemStatus::InProgress,
    }
}
