use std::path::PathBuf;

use anyhow::Result;
use auto_study::config::Config;
use auto_study::orchestrator::{App, Task};
use auto_study::utils::logging;
use clap::Parser;
use tracing::error;

/// 网课平台自动学习：视频、作业、考试
#[derive(Debug, Parser)]
#[command(name = "auto_study", version, about)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// 要执行的任务，可重复指定；不指定时依次执行全部
    #[arg(short, long, value_enum)]
    task: Vec<Task>,

    /// 每个任务使用独立的浏览器并行执行
    #[arg(long)]
    parallel: bool,

    /// 无头模式运行（覆盖配置文件）
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    let args = Args::parse();

    // 加载配置，失败直接退出
    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ 加载配置失败: {}", e);
            std::process::exit(1);
        }
    };
    if args.headless {
        config.browser.headless = true;
    }

    App::new(config, &args.task, args.parallel).run().await
}
