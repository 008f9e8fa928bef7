//! 顶层任务

use std::fmt;

use clap::ValueEnum;

/// 可以单独运行的学习任务
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Task {
    /// 视频学习
    Video,
    /// 作业
    Homework,
    /// 考试
    Exam,
}

impl Task {
    /// 不指定任务时按此顺序全部执行
    pub fn all() -> Vec<Task> {
        vec![Task::Video, Task::Homework, Task::Exam]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Task::Video => "视频学习",
            Task::Homework => "作业",
            Task::Exam => "考试",
        }
    }

    /// 去掉重复的任务，保留第一次出现的顺序；为空时返回全部任务
    pub fn normalize(tasks: &[Task]) -> Vec<Task> {
        let mut out: Vec<Task> = Vec::new();
        for task in tasks {
            if !out.contains(task) {
                out.push(*task);
            }
        }
        if out.is_empty() {
            Task::all()
        } else {
            out
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_defaults_to_all() {
        assert_eq!(Task::normalize(&[]), Task::all());
    }

    #[test]
    fn test_normalize_keeps_first_occurrence() {
        assert_eq!(
            Task::normalize(&[Task::Exam, Task::Video, Task::Exam]),
            vec![Task::Exam, Task::Video]
        );
    }

    #[test]
    fn test_value_enum_names() {
        assert_eq!(Task::from_str("homework", true).unwrap(), Task::Homework);
        assert!(Task::from_str("paper", true).is_err());
    }
}
