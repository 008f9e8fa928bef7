//! 视频播放相关的数据

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// 播放倍速
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSpeed {
    X0_5,
    X1,
    X1_25,
    X1_5,
    #[default]
    X2,
}

impl VideoSpeed {
    /// 写入 `video.playbackRate` 的数值
    pub fn rate(&self) -> f64 {
        match self {
            VideoSpeed::X0_5 => 0.5,
            VideoSpeed::X1 => 1.0,
            VideoSpeed::X1_25 => 1.25,
            VideoSpeed::X1_5 => 1.5,
            VideoSpeed::X2 => 2.0,
        }
    }

    /// 播放器倍速菜单里显示的文字
    pub fn menu_label(&self) -> &'static str {
        match self {
            VideoSpeed::X0_5 => "0.5X",
            VideoSpeed::X1 => "正常",
            VideoSpeed::X1_25 => "1.25X",
            VideoSpeed::X1_5 => "1.5X",
            VideoSpeed::X2 => "2X",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoSpeed::X0_5 => "0.5X",
            VideoSpeed::X1 => "1X",
            VideoSpeed::X1_25 => "1.25X",
            VideoSpeed::X1_5 => "1.5X",
            VideoSpeed::X2 => "2X",
        }
    }
}

impl fmt::Display for VideoSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "0.5X" => Ok(VideoSpeed::X0_5),
            "1X" | "1.0X" => Ok(VideoSpeed::X1),
            "1.25X" => Ok(VideoSpeed::X1_25),
            "1.5X" => Ok(VideoSpeed::X1_5),
            "2X" | "2.0X" => Ok(VideoSpeed::X2),
            other => Err(format!("不支持的倍速: {}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for VideoSpeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 页面上 `<video>` 元素的播放状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaState {
    pub ended: bool,
    pub current_time: f64,
    pub duration: f64,
}

/// 一次检测读到的页面状态，完成判定只依赖这份快照
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignals {
    /// 完成弹窗的 style 属性，元素不存在时为 None
    pub popup_style: Option<String>,
    /// "学习下一节"按钮是否存在且可见
    pub next_visible: bool,
    /// 完成提示区域的文字
    pub tip_text: Option<String>,
    pub media: Option<MediaState>,
}
