//! 学习平台的页面结构
//!
//! 选择器、链接和页面脚本集中放在这里，页面改版时只改这一处

use crate::infrastructure::{Locator, LocatorChain};

/// 学生中心链接
pub const COURSE_LIST_HREF: &str = "mycourselist.aspx?m=wdkc";
pub const HOMEWORK_HREF: &str = "dohomework.aspx?m=wdzy";
pub const EXAM_HREF: &str = "ExaminationQuery.aspx?m=wdks";

/// 完成提示文字
pub const FINISHED_TIP: &str = "本课时已学完";

/// 单次运行最多处理的作业数
pub const MAX_HOMEWORK_ITEMS: usize = 20;

/// 单次运行最多处理的考试数
pub const MAX_EXAMS: usize = 20;

fn href_link(href: &str, text: &str) -> LocatorChain {
    LocatorChain::new(vec![
        Locator::css(format!("a[href*='{}']", href)),
        Locator::text("a", text),
    ])
}

pub fn login_username() -> LocatorChain {
    Locator::css("input[type='text']").into()
}

pub fn login_password() -> LocatorChain {
    Locator::css("input[type='password']").into()
}

pub fn login_button() -> LocatorChain {
    LocatorChain::new(vec![
        Locator::css("a.lg-card-btn#lg-card-btn"),
        Locator::text("a", "登录"),
    ])
}

pub fn course_list_link() -> LocatorChain {
    href_link(COURSE_LIST_HREF, "我的课程")
}

pub fn studying_tab() -> LocatorChain {
    LocatorChain::new(vec![
        Locator::css("a[href='javascript:getStuding();']"),
        Locator::text("a", "学习中"),
    ])
}

pub fn homework_link() -> LocatorChain {
    href_link(HOMEWORK_HREF, "我的作业")
}

pub fn exam_link() -> LocatorChain {
    href_link(EXAM_HREF, "我的考试")
}

pub fn unfinished_exam_tab() -> LocatorChain {
    LocatorChain::new(vec![
        Locator::css("a[data-isfinined='1']"),
        Locator::text("a", "未完成"),
    ])
}

pub fn next_section() -> LocatorChain {
    Locator::css("#learnNextSection").into()
}

pub fn speed_setting() -> LocatorChain {
    LocatorChain::new(vec![
        Locator::css(".prism-setting-item.prism-setting-speed"),
        Locator::css(".prism-setting-btn"),
    ])
}

pub fn speed_option(label: &str) -> LocatorChain {
    LocatorChain::new(vec![
        Locator::xpath(format!(
            "//div[contains(@class, 'prism-speed-selector')]//li//span[text()='{}']",
            label
        )),
        Locator::text(".prism-speed-selector .selector-list li span", label),
    ])
}

pub fn homework_container() -> LocatorChain {
    Locator::css("div.exam").into()
}

pub fn homework_submit() -> LocatorChain {
    LocatorChain::new(vec![
        Locator::css("#btn_save2"),
        Locator::text("a", "提交作业"),
    ])
}

pub fn exam_question() -> LocatorChain {
    Locator::css(".exam_question").into()
}

pub fn exam_submit() -> LocatorChain {
    LocatorChain::new(vec![
        Locator::text("button", "交卷"),
        Locator::text("a", "交卷"),
    ])
}

pub fn exam_confirm() -> LocatorChain {
    Locator::text("button", "确定").into()
}

/// 一次读出完成判定需要的全部页面状态
pub const PROBE_SIGNALS_JS: &str = r#"(() => {
    const styles = ['#reader_msgbg', '#reader_success_video.success']
        .map(s => document.querySelector(s))
        .filter(Boolean)
        .map(e => e.getAttribute('style') || '');
    const popupStyle = styles.find(s => /display:\s*block/.test(s)) ?? (styles.length ? styles[0] : null);
    const next = document.querySelector('#learnNextSection');
    const nextVisible = !!next && next.offsetParent !== null && getComputedStyle(next).visibility !== 'hidden';
    const tip = document.querySelector('#tipResult');
    const v = document.querySelector('video');
    const media = v ? {
        ended: !!v.ended,
        currentTime: isFinite(v.currentTime) ? v.currentTime : 0,
        duration: isFinite(v.duration) ? v.duration : 0
    } : null;
    return { popupStyle, nextVisible, tipText: tip ? (tip.innerText || '').trim() : null, media };
})()"#;

/// 课程列表：每个 "进入学习" 按钮对应一行
pub const COURSE_ROWS_JS: &str = r#"(() => {
    const buttons = Array.from(document.querySelectorAll('a')).filter(a => (a.innerText || '').includes('进入学习'));
    return buttons.map((btn, i) => {
        let node = btn, progressText = null, title = null;
        for (let depth = 0; depth < 5 && node.parentElement; depth++) {
            node = node.parentElement;
            const p = node.querySelector('p.learningStatus span.lsPercents');
            if (p) {
                progressText = (p.innerText || '').trim();
                const a = node.querySelector('a');
                title = a ? (a.getAttribute('title') || a.innerText) : null;
                break;
            }
        }
        return { title: (title || btn.getAttribute('title') || ('课程 ' + (i + 1))).trim(), progressText };
    });
})()"#;

/// 点击第 `index` 个 "进入学习" 按钮
pub fn click_course_js(index: usize) -> String {
    format!(
        r#"(() => {{
    const buttons = Array.from(document.querySelectorAll('a')).filter(a => (a.innerText || '').includes('进入学习'));
    const btn = buttons[{}];
    if (!btn) return false;
    btn.setAttribute('target', '_blank');
    btn.click();
    return true;
}})()"#,
        index
    )
}

/// 直接设置 `<video>` 的播放速率
pub fn set_playback_rate_js(rate: f64) -> String {
    format!(
        "(() => {{ const v = document.querySelector('video'); if (!v) return false; v.playbackRate = {}; if (v.paused) v.play().catch(() => {{}}); return true; }})()",
        rate
    )
}

/// 作业列表
pub const HOMEWORK_ROWS_JS: &str = r#"(() => {
    return Array.from(document.querySelectorAll('div.home-list')).map(row => {
        const name = row.querySelector('div.work_course_name span');
        const btn = row.querySelector('div.home-btn a.seeWork');
        const status = row.querySelector('div.work-status');
        return {
            name: name ? (name.innerText || '').trim() : '',
            buttonText: btn ? (btn.innerText || '').trim() : '',
            statusText: status ? (status.innerText || '').trim() : ''
        };
    });
})()"#;

/// 点击第 `position` 项作业的按钮
pub fn click_homework_js(position: usize) -> String {
    format!(
        "(() => {{ const rows = document.querySelectorAll('div.home-list'); const row = rows[{}]; if (!row) return false; const btn = row.querySelector('div.home-btn a.seeWork'); if (!btn) return false; btn.click(); return true; }})()",
        position
    )
}

/// 作业题目：标题 + 选项
pub const HOMEWORK_QUESTIONS_JS: &str = r#"(() => {
    return Array.from(document.querySelectorAll('div.exam_question')).map(q => {
        const title = q.querySelector('div.exam_question_title');
        const options = Array.from(q.querySelectorAll('ul.question_select li')).map(li => {
            const mark = li.querySelector('em.select_mark');
            const detail = li.querySelector('div.select_detail');
            const label = mark ? ((mark.innerText || '').trim().split(/\s+/)[0] || '') : '';
            return { label, text: detail ? (detail.innerText || '').trim() : '' };
        });
        return { title: title ? (title.innerText || '').trim() : '', options };
    });
})()"#;

/// 作业选项：点击第 `question` 题的第 `option` 个选项，并确保单选框选中
pub fn select_homework_option_js(question: usize, option: usize) -> String {
    format!(
        r#"(() => {{
    const q = document.querySelectorAll('div.exam_question')[{}];
    if (!q) return false;
    const li = q.querySelectorAll('ul.question_select li')[{}];
    if (!li) return false;
    li.click();
    const input = li.querySelector("input[type='radio'], input[type='checkbox']");
    if (input && !input.checked) input.click();
    return true;
}})()"#,
        question, option
    )
}

/// 提交后从作业记录中读最新一次分数的文字
pub const HOMEWORK_SCORE_JS: &str = r#"(() => {
    const r = document.evaluate("//div[@class='work_record']//a[contains(text(), '分')]", document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    if (r.snapshotLength > 0) return (r.snapshotItem(r.snapshotLength - 1).innerText || '').trim();
    const any = Array.from(document.querySelectorAll('body *')).find(e => e.children.length === 0 && /(分数|得分).*\d+分/.test(e.innerText || ''));
    return any ? (any.innerText || '').trim() : null;
})()"#;

/// 未完成考试列表
pub const EXAM_ROWS_JS: &str = r#"(() => {
    return Array.from(document.querySelectorAll('.exam-list')).map(item => {
        const em = item.querySelector('em');
        const title = item.querySelector('p.mes-title span') || item.querySelector('span');
        return {
            name: title ? (title.innerText || '').trim() : '',
            statusText: em ? (em.innerText || '').trim() : ''
        };
    });
})()"#;

/// 打开第 `index` 个考试项的下拉菜单
pub fn open_exam_dropdown_js(index: usize) -> String {
    format!(
        "(() => {{ const item = document.querySelectorAll('.exam-list')[{}]; if (!item) return false; const btn = item.querySelector('.el-dropdown__caret-button'); if (!btn) return false; btn.click(); return true; }})()",
        index
    )
}

/// 点击下拉菜单中的 "开始考试"
pub const CLICK_START_EXAM_JS: &str = r#"(() => {
    const btn = Array.from(document.querySelectorAll('li.el-dropdown-menu__item button, .el-dropdown-menu__item'))
        .find(b => (b.innerText || '').includes('开始考试'));
    if (!btn) return false;
    btn.click();
    return true;
})()"#;

/// 下拉菜单不可用时直接点主按钮
pub fn click_exam_primary_js(index: usize) -> String {
    format!(
        "(() => {{ const item = document.querySelectorAll('.exam-list')[{}]; if (!item) return false; const btn = item.querySelector('.el-button.el-button--primary'); if (!btn) return false; btn.click(); return true; }})()",
        index
    )
}

/// 考试题目：标题 + 选项文字（选项是 radio / checkbox）
pub const EXAM_QUESTIONS_JS: &str = r#"(() => {
    return Array.from(document.querySelectorAll('.exam_question')).map(q => {
        const title = q.querySelector('.exam_question_title');
        const inputs = q.querySelectorAll("input[type='radio'], input[type='checkbox']");
        const details = Array.from(q.querySelectorAll('.select_detail')).map(d => (d.innerText || '').trim());
        const options = Array.from(inputs).map((_, i) => ({
            label: String.fromCharCode(65 + i),
            text: details[i] || ''
        }));
        return { title: title ? (title.innerText || '').trim() : '', options };
    });
})()"#;

/// 考试选项：通过 JS 点击第 `question` 题的第 `option` 个输入框
pub fn click_exam_option_js(question: usize, option: usize) -> String {
    format!(
        r#"(() => {{
    const q = document.querySelectorAll('.exam_question')[{}];
    if (!q) return false;
    const input = q.querySelectorAll("input[type='radio'], input[type='checkbox']")[{}];
    if (!input) return false;
    input.click();
    return true;
}})()"#,
        question, option
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_chains_prefer_href() {
        let chain = homework_link();
        assert_eq!(chain.steps()[0], Locator::css("a[href*='dohomework.aspx?m=wdzy']"));
        assert_eq!(chain.steps()[1], Locator::text("a", "我的作业"));
    }

    #[test]
    fn test_speed_option_uses_menu_label() {
        let chain = speed_option("正常");
        assert!(chain.to_string().contains("正常"));
        assert_eq!(chain.steps().len(), 2);
    }

    #[test]
    fn test_index_scripts_embed_index() {
        assert!(click_course_js(3).contains("buttons[3]"));
        assert!(click_homework_js(0).contains("rows[0]"));
        assert!(click_exam_option_js(2, 1).contains("[2]"));
        assert!(set_playback_rate_js(1.5).contains("playbackRate = 1.5"));
    }
}
