//! 课程列表项

use serde::Deserialize;

/// "学习中" 列表里的一门课
#[derive(Debug, Clone, PartialEq)]
pub struct CourseEntry {
    /// 在 "进入学习" 按钮列表中的下标
    pub index: usize,
    pub title: String,
    /// 学习进度（百分比），页面未显示时为 None
    pub progress: Option<f64>,
}

/// 页面脚本读出的原始行
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCourseRow {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub progress_text: Option<String>,
}

impl CourseEntry {
    pub fn from_raw(index: usize, raw: &RawCourseRow) -> Self {
        Self {
            index,
            title: raw.title.trim().to_string(),
            progress: raw.progress_text.as_deref().and_then(parse_progress),
        }
    }

    /// 未学完（没有进度信息的也算）
    pub fn is_unfinished(&self) -> bool {
        self.progress.map(|p| p < 100.0).unwrap_or(true)
    }
}

/// 解析 "37.5%" 这样的进度文字
pub fn parse_progress(text: &str) -> Option<f64> {
    let cleaned = text.trim().trim_end_matches('%').trim();
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress() {
        assert_eq!(parse_progress("37.5%"), Some(37.5));
        assert_eq!(parse_progress(" 100% "), Some(100.0));
        assert_eq!(parse_progress("0"), Some(0.0));
        assert_eq!(parse_progress("未开始"), None);
    }

    #[test]
    fn test_unfinished() {
        let raw = RawCourseRow {
            title: "高等数学".to_string(),
            progress_text: Some("100%".to_string()),
        };
        assert!(!CourseEntry::from_raw(0, &raw).is_unfinished());

        let raw = RawCourseRow {
            title: "大学英语".to_string(),
            progress_text: None,
        };
        let entry = CourseEntry::from_raw(1, &raw);
        assert!(entry.is_unfinished());
        assert_eq!(entry.progress, None);
    }
}
