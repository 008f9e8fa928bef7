//! 调试现场保存 - 业务能力层
//!
//! 在找不到作业容器、找不到题目等路径上保存截图和页面源码

use std::path::{Path, PathBuf};

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use tracing::{debug, info, warn};

/// 调试现场保存服务
pub struct PageDumper {
    dir: PathBuf,
}

/// 一次保存得到的文件
#[derive(Debug, Clone, Default)]
pub struct DumpFiles {
    pub screenshot: Option<PathBuf>,
    pub html: Option<PathBuf>,
}

impl PageDumper {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 保存截图和页面源码，任一失败只记录警告
    ///
    /// # 参数
    /// - `page`: 出问题的页面
    /// - `label`: 文件名前缀，如 `homework_page`
    pub async fn dump(&self, page: &Page, label: &str) -> DumpFiles {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut files = DumpFiles::default();

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("无法创建调试目录 {}: {}", self.dir.display(), e);
            return files;
        }

        match self.save_screenshot(page, label, &stamp).await {
            Ok(path) => {
                info!("📸 已保存页面截图: {}", path.display());
                files.screenshot = Some(path);
            }
            Err(e) => warn!("保存截图失败: {}", e),
        }

        match page.content().await {
            Ok(html) => match self.write_html(label, &stamp, &html).await {
                Ok(path) => {
                    info!("📄 已保存页面源码: {}", path.display());
                    files.html = Some(path);
                }
                Err(e) => warn!("保存页面源码失败: {}", e),
            },
            Err(e) => warn!("读取页面源码失败: {}", e),
        }

        files
    }

    async fn save_screenshot(&self, page: &Page, label: &str, stamp: &str) -> Result<PathBuf> {
        let bytes = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await?;
        let path = self.dir.join(dump_file_name(label, stamp, "png"));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// 写入页面源码
    pub async fn write_html(&self, label: &str, stamp: &str, html: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(dump_file_name(label, stamp, "html"));
        debug!("写入页面源码: {} ({} 字节)", path.display(), html.len());
        tokio::fs::write(&path, html).await?;
        Ok(path)
    }
}

/// `{label}_{stamp}.{ext}`，label 中的路径分隔符替换为下划线
pub fn dump_file_name(label: &str, stamp: &str, ext: &str) -> String {
    let safe: String = label
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{}_{}.{}", safe, stamp, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_file_name() {
        assert_eq!(
            dump_file_name("homework_page", "20240101_120000", "png"),
            "homework_page_20240101_120000.png"
        );
        assert_eq!(dump_file_name("a/b c", "1", "html"), "a_b_c_1.html");
    }

    #[tokio::test]
    async fn test_write_html_creates_dir() {
        let dir = std::env::temp_dir().join(format!("auto_study_dump_{}", std::process::id()));
        let dumper = PageDumper::new(&dir);
        let path = dumper
            .write_html("homework_source", "test", "<html></html>")
            .await
            .unwrap();
        assert!(path.starts_with(&dir));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
        std::fs::remove_dir_all(&dir).ok();
    }
}
