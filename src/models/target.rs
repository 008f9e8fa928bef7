//! 被轮询的学习窗口

use std::fmt;
use std::time::{Duration, Instant};

/// 会话内的标签页句柄，由 `Session` 分配
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabHandle(pub String);

impl TabHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 窗口状态: `Opening → Playing → {Completed, Stuck}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Opening,
    Playing,
    Completed,
    /// 连续出错，放弃该窗口
    Stuck,
}

impl TargetState {
    /// 已退出轮询
    pub fn is_retired(&self) -> bool {
        matches!(self, TargetState::Completed | TargetState::Stuck)
    }
}

/// 一个正在学习的窗口
#[derive(Debug, Clone)]
pub struct Target {
    /// 序号，仅用于日志（从 1 开始）
    pub index: usize,
    pub handle: TabHandle,
    pub state: TargetState,
    pub last_checked: Option<Instant>,
    /// 当前课时的检测次数，切换到下一节后清零
    pub check_count: u32,
    pub consecutive_errors: u32,
    /// 在该窗口里完成的课时数
    pub units_completed: u32,
}

impl Target {
    pub fn new(index: usize, handle: TabHandle) -> Self {
        Self {
            index,
            handle,
            state: TargetState::Opening,
            last_checked: None,
            check_count: 0,
            consecutive_errors: 0,
            units_completed: 0,
        }
    }

    /// 距离上次检测是否已满 `interval`
    pub fn is_due(&self, now: Instant, interval: Duration) -> bool {
        match self.last_checked {
            None => true,
            Some(last) => now.duration_since(last) >= interval,
        }
    }

    pub fn is_retired(&self) -> bool {
        self.state.is_retired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_target_is_due() {
        let target = Target::new(1, TabHandle::new("tab-2"));
        assert_eq!(target.state, TargetState::Opening);
        assert!(target.is_due(Instant::now(), Duration::from_secs(5)));
        assert_eq!(target.handle.to_string(), "tab-2");
    }

    #[test]
    fn test_due_after_interval() {
        let mut target = Target::new(1, TabHandle::new("t"));
        let now = Instant::now();
        target.last_checked = Some(now);
        assert!(!target.is_due(now, Duration::from_secs(5)));
        assert!(target.is_due(now + Duration::from_secs(5), Duration::from_secs(5)));
    }

    #[test]
    fn test_retired_states() {
        assert!(TargetState::Completed.is_retired());
        assert!(TargetState::Stuck.is_retired());
        assert!(!TargetState::Playing.is_retired());
        assert!(!TargetState::Opening.is_retired());
    }
}
