//! 考试列表项

use serde::Deserialize;

/// 页面脚本读出的原始文本
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExamRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status_text: String,
}

/// "未完成"标签下的一项考试
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamEntry {
    /// 在列表中的位置（0-based）
    pub position: usize,
    pub name: String,
    pub status_text: String,
}

impl ExamEntry {
    pub fn from_raw(position: usize, raw: &RawExamRow) -> Self {
        Self {
            position,
            name: raw.name.trim().to_string(),
            status_text: raw.status_text.trim().to_string(),
        }
    }

    /// 状态为"未考试"/"未完成"或没有状态文字，且有名称
    pub fn is_pending(&self) -> bool {
        if self.name.is_empty() {
            return false;
        }
        self.status_text.is_empty()
            || self.status_text.contains("未考试")
            || self.status_text.contains("未完成")
    }

    pub fn status_label(&self) -> &str {
        if self.status_text.is_empty() {
            "未开始"
        } else {
            &self.status_text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, status: &str) -> ExamEntry {
        ExamEntry::from_raw(
            0,
            &RawExamRow {
                name: name.to_string(),
                status_text: status.to_string(),
            },
        )
    }

    #[test]
    fn test_pending_status() {
        assert!(entry("期末考试", "未考试").is_pending());
        assert!(entry("期末考试", "未完成").is_pending());
        assert!(entry("期末考试", "").is_pending());
        assert!(!entry("期末考试", "已完成").is_pending());
    }

    #[test]
    fn test_nameless_row_is_skipped() {
        assert!(!entry("  ", "未考试").is_pending());
    }

    #[test]
    fn test_status_label() {
        assert_eq!(entry("a", "").status_label(), "未开始");
        assert_eq!(entry("a", "未考试").status_label(), "未考试");
    }
}
