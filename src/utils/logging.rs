//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志，级别由 `RUST_LOG` 控制，默认 info
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // 测试中可能重复初始化，忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `tasks`: 本次要执行的任务名
/// - `parallel`: 是否并行执行
pub fn log_startup(tasks: &[&str], parallel: bool) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 程序启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📋 任务: {}", tasks.join(" → "));
    info!("⚙️ 模式: {}", if parallel { "并行" } else { "顺序" });
    info!("{}", "=".repeat(60));
}

/// 记录任务开始
pub fn log_task_start(name: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始任务: {}", name);
    info!("{}", "=".repeat(60));
}

/// 记录任务结束
pub fn log_task_complete(name: &str, summary: &str) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 任务 {} 结束: {}", name, summary);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功的任务数
/// - `failed`: 失败的任务数
pub fn print_final_stats(success: usize, failed: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部任务完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, success + failed);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("一二三四五六", 3), "一二三...");
        assert_eq!(truncate_text("", 3), "");
    }
}
