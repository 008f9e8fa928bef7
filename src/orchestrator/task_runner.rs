//! 单个任务的执行器 - 编排层
//!
//! 在一个已登录的 `Session` 上运行一个任务，返回结果摘要

use anyhow::Result;

use super::task::Task;
use crate::config::Config;
use crate::infrastructure::Session;
use crate::services::PageDumper;
use crate::utils::StopFlag;
use crate::workflow::{exam_flow, homework_flow, video_flow};

/// 运行一个任务
///
/// # 返回
/// 任务结果的一行摘要，用于最终统计
pub async fn run_task(
    session: &mut Session,
    config: &Config,
    task: Task,
    stop: &StopFlag,
) -> Result<String> {
    let dumper = PageDumper::new(&config.debug.dump_dir);
    match task {
        Task::Video => {
            let report = video_flow::run(session, config, stop).await?;
            Ok(report.summary())
        }
        Task::Homework => {
            let resolver = homework_flow::build_resolver(config).await;
            let report = homework_flow::run(session, config, &resolver, &dumper, stop).await?;
            Ok(report.summary())
        }
        Task::Exam => {
            let resolver = exam_flow::build_resolver(config).await?;
            let report = exam_flow::run(session, config, &resolver, &dumper, stop).await?;
            Ok(report.summary())
        }
    }
}
