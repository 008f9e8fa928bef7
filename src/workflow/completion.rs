//! 课时完成判定
//!
//! 纯函数，只看 `PageSignals` 快照。四项检查按优先级排列，第一项为真即判定完成。

use crate::models::PageSignals;

use super::portal::FINISHED_TIP;

/// 剩余时长小于等于该值（秒）视为播放完成
pub const NEAR_END_SECS: f64 = 10.0;

/// 判定完成的依据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSignal {
    /// 完成弹窗显示
    Popup,
    /// "学习下一节"按钮可见
    NextVisible,
    /// 出现 "本课时已学完"
    TipText,
    /// 视频结束或接近结束
    Media,
}

impl CompletionSignal {
    pub fn describe(&self) -> &'static str {
        match self {
            CompletionSignal::Popup => "完成弹窗",
            CompletionSignal::NextVisible => "学习下一节按钮",
            CompletionSignal::TipText => "完成提示文字",
            CompletionSignal::Media => "视频播放结束",
        }
    }
}

pub fn popup_shown(signals: &PageSignals) -> bool {
    signals
        .popup_style
        .as_deref()
        .map(|style| {
            let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
            compact.contains("display:block")
        })
        .unwrap_or(false)
}

pub fn next_visible(signals: &PageSignals) -> bool {
    signals.next_visible
}

pub fn tip_says_finished(signals: &PageSignals) -> bool {
    signals
        .tip_text
        .as_deref()
        .map(|t| t.contains(FINISHED_TIP))
        .unwrap_or(false)
}

pub fn media_finished(signals: &PageSignals) -> bool {
    match signals.media {
        Some(media) if media.ended => true,
        Some(media) => media.duration > 0.0 && media.duration - media.current_time <= NEAR_END_SECS,
        None => false,
    }
}

/// 按优先级返回第一个成立的完成依据
pub fn completion_signal(signals: &PageSignals) -> Option<CompletionSignal> {
    if popup_shown(signals) {
        Some(CompletionSignal::Popup)
    } else if next_visible(signals) {
        Some(CompletionSignal::NextVisible)
    } else if tip_says_finished(signals) {
        Some(CompletionSignal::TipText)
    } else if media_finished(signals) {
        Some(CompletionSignal::Media)
    } else {
        None
    }
}

pub fn is_completed(signals: &PageSignals) -> bool {
    completion_signal(signals).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaState;

    fn playing() -> PageSignals {
        PageSignals {
            popup_style: Some("display: none;".to_string()),
            next_visible: false,
            tip_text: Some("".to_string()),
            media: Some(MediaState {
                ended: false,
                current_time: 30.0,
                duration: 600.0,
            }),
        }
    }

    #[test]
    fn test_playing_is_not_completed() {
        assert!(!is_completed(&playing()));
        assert!(!is_completed(&PageSignals::default()));
    }

    #[test]
    fn test_popup_check() {
        let mut s = playing();
        s.popup_style = Some("z-index: 9; display:block".to_string());
        assert_eq!(completion_signal(&s), Some(CompletionSignal::Popup));
        s.popup_style = Some("display: block;".to_string());
        assert!(popup_shown(&s));
        s.popup_style = None;
        assert!(!popup_shown(&s));
    }

    #[test]
    fn test_next_visible_check() {
        let mut s = playing();
        s.next_visible = true;
        assert_eq!(completion_signal(&s), Some(CompletionSignal::NextVisible));
    }

    #[test]
    fn test_tip_text_check() {
        let mut s = playing();
        s.tip_text = Some("恭喜，本课时已学完！".to_string());
        assert_eq!(completion_signal(&s), Some(CompletionSignal::TipText));
    }

    #[test]
    fn test_media_checks() {
        let mut s = playing();
        s.media = Some(MediaState {
            ended: true,
            current_time: 0.0,
            duration: 0.0,
        });
        assert_eq!(completion_signal(&s), Some(CompletionSignal::Media));

        s.media = Some(MediaState {
            ended: false,
            current_time: 590.0,
            duration: 600.0,
        });
        assert!(media_finished(&s));

        s.media = Some(MediaState {
            ended: false,
            current_time: 589.0,
            duration: 600.0,
        });
        assert!(!media_finished(&s));

        // 元数据未加载时 duration 为 0
        s.media = Some(MediaState::default());
        assert!(!media_finished(&s));
    }

    #[test]
    fn test_priority_order() {
        let mut s = playing();
        s.next_visible = true;
        s.tip_text = Some(FINISHED_TIP.to_string());
        s.popup_style = Some("display: block".to_string());
        assert_eq!(completion_signal(&s), Some(CompletionSignal::Popup));
        s.popup_style = None;
        assert_eq!(completion_signal(&s), Some(CompletionSignal::NextVisible));
    }
}
