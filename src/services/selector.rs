//! 作业/考试选择器
//!
//! 两轮扫描：先找未开始的，再（允许重做时）找分数不及格的。
//! 只要还有未开始的作业，就不会去重做已提交的。

use crate::models::{HomeworkItem, ItemStatus};

/// 选择下一项要做的作业，没有可做的返回 None
///
/// # 参数
/// - `items`: 列表页上读到的作业，按页面顺序
/// - `passing_score`: 及格线
/// - `retry_if_failed`: 是否重做不及格的作业
pub fn select_next_item(
    items: &[HomeworkItem],
    passing_score: u32,
    retry_if_failed: bool,
) -> Option<&HomeworkItem> {
    if let Some(item) = items.iter().find(|i| i.status == ItemStatus::NotStarted) {
        return Some(item);
    }
    if !retry_if_failed {
        return None;
    }
    items.iter().find(|i| i.is_below(passing_score))
}
