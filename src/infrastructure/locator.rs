//! 元素定位
//!
//! 所有定位最终都转成一段 JS 表达式，在页面里求值，
//! 这样 `JsExecutor` 只需要会执行 JS 就够了。

use std::fmt;

/// 单个定位方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    /// 指定标签中文字包含 `text` 的元素
    Text { tag: String, text: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    pub fn text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::Text {
            tag: tag.into(),
            text: text.into(),
        }
    }

    /// 返回第一个匹配元素（或 null）的 JS 表达式
    pub fn js_find(&self) -> String {
        match self {
            Locator::Css(sel) => format!("document.querySelector({})", js_str(sel)),
            Locator::XPath(expr) => format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                js_str(expr)
            ),
            Locator::Text { tag, text } => format!(
                "(Array.from(document.querySelectorAll({})).find(e => (e.innerText || e.textContent || '').includes({})) || null)",
                js_str(tag),
                js_str(text)
            ),
        }
    }

    /// 返回全部匹配元素数组的 JS 表达式
    pub fn js_find_all(&self) -> String {
        match self {
            Locator::Css(sel) => format!("Array.from(document.querySelectorAll({}))", js_str(sel)),
            Locator::XPath(expr) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); return out; }})()",
                js_str(expr)
            ),
            Locator::Text { tag, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(e => (e.innerText || e.textContent || '').includes({}))",
                js_str(tag),
                js_str(text)
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(sel) => write!(f, "css={}", sel),
            Locator::XPath(expr) => write!(f, "xpath={}", expr),
            Locator::Text { tag, text } => write!(f, "{}:text({})", tag, text),
        }
    }
}

/// 按顺序尝试的一组定位方式，第一个命中的为准
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorChain {
    steps: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(steps: Vec<Locator>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Locator] {
        &self.steps
    }

    pub fn js_find(&self) -> String {
        let mut body = String::from("(() => { let el = null;");
        for step in &self.steps {
            body.push_str(&format!(" el = {}; if (el) return el;", step.js_find()));
        }
        body.push_str(" return null; })()");
        body
    }
}

impl From<Locator> for LocatorChain {
    fn from(locator: Locator) -> Self {
        Self::new(vec![locator])
    }
}

impl fmt::Display for LocatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.steps.iter().map(|s| s.to_string()).collect();
        f.write_str(&parts.join(" | "))
    }
}

/// 在找到的元素上执行 `body`（元素变量名为 `el`），找不到时脚本返回 null
pub fn with_element(find_expr: &str, body: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return null; {} }})()",
        find_expr, body
    )
}

/// 判断元素可见的 JS 片段（元素变量名为 `el`）
pub const JS_VISIBLE: &str =
    "(el.offsetParent !== null && window.getComputedStyle(el).visibility !== 'hidden')";

/// 把 Rust 字符串转成 JS 字符串字面量
pub fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_str_escapes_quotes() {
        assert_eq!(js_str("a'b\"c"), r#""a'b\"c""#);
        assert_eq!(js_str("本课时已学完"), "\"本课时已学完\"");
    }

    #[test]
    fn test_css_and_xpath_expressions() {
        let css = Locator::css("#learnNextSection");
        assert_eq!(css.js_find(), "document.querySelector(\"#learnNextSection\")");

        let xpath = Locator::xpath("//a[contains(text(),'进入学习')]");
        assert!(xpath.js_find().contains("FIRST_ORDERED_NODE_TYPE"));
        assert!(xpath.js_find_all().contains("snapshotLength"));
    }

    #[test]
    fn test_chain_tries_steps_in_order() {
        let chain = LocatorChain::new(vec![
            Locator::css(".el-dropdown__caret-button"),
            Locator::text("button", "开始考试"),
        ]);
        let js = chain.js_find();
        let first = js.find("el-dropdown__caret-button").unwrap();
        let second = js.find("开始考试").unwrap();
        assert!(first < second);
        assert!(js.ends_with("return null; })()"));
        assert_eq!(
            chain.to_string(),
            "css=.el-dropdown__caret-button | button:text(开始考试)"
        );
    }

    #[test]
    fn test_with_element_guards_null() {
        let js = with_element("document.querySelector('#x')", "return el.innerText;");
        assert!(js.contains("if (!el) return null;"));
    }
}
