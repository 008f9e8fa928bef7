//! JS 执行器 - 基础设施层
//!
//! 持有一个标签页的 page 句柄，只暴露"执行 JS"及基于 JS 的元素操作

use anyhow::Result;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::locator::{js_str, with_element, LocatorChain, JS_VISIBLE};

/// JS 执行器
///
/// 职责：
/// - 持有一个 Page 句柄
/// - 暴露 eval() 能力
/// - 元素找不到时返回 false / None，而不是错误
/// - 不认识作业 / 视频 / 考试
#[derive(Clone)]
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于截图、导航等操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    ///
    /// 脚本返回 `null` / `undefined` 时得到 `JsonValue::Null`
    ///
    /// # 参数
    /// - `js_code`: 要执行的 JavaScript 表达式
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        Ok(result.into_value().unwrap_or(JsonValue::Null))
    }

    /// 执行 JS 代码并反序列化为指定类型
    ///
    /// # 参数
    /// - `js_code`: 要执行的 JavaScript 表达式
    ///
    /// # 返回
    /// 返回反序列化后的类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 元素是否存在
    pub async fn exists(&self, chain: &LocatorChain) -> Result<bool> {
        let js = format!("({}) !== null", chain.js_find());
        Ok(self.eval(js).await?.as_bool().unwrap_or(false))
    }

    /// 元素是否存在且可见
    pub async fn is_visible(&self, chain: &LocatorChain) -> Result<bool> {
        let js = with_element(&chain.js_find(), &format!("return {};", JS_VISIBLE));
        Ok(self.eval(js).await?.as_bool().unwrap_or(false))
    }

    /// 点击元素，返回是否找到并点击
    pub async fn click(&self, chain: &LocatorChain) -> Result<bool> {
        debug!("点击: {}", chain);
        let js = with_element(&chain.js_find(), "el.click(); return true;");
        Ok(self.eval(js).await?.as_bool().unwrap_or(false))
    }

    /// 元素的可见文字（已 trim）
    pub async fn text(&self, chain: &LocatorChain) -> Result<Option<String>> {
        let js = with_element(
            &chain.js_find(),
            "return (el.innerText || el.textContent || '').trim();",
        );
        self.eval_as(js).await
    }

    /// 元素属性值
    pub async fn attribute(&self, chain: &LocatorChain, name: &str) -> Result<Option<String>> {
        let js = with_element(
            &chain.js_find(),
            &format!("return el.getAttribute({});", js_str(name)),
        );
        self.eval_as(js).await
    }

    /// 给输入框填值并触发 input / change 事件
    pub async fn fill(&self, chain: &LocatorChain, value: &str) -> Result<bool> {
        let body = format!(
            "el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true;",
            js_str(value)
        );
        let js = with_element(&chain.js_find(), &body);
        Ok(self.eval(js).await?.as_bool().unwrap_or(false))
    }

    /// 给元素加红框，`duration_ms` 后恢复
    pub async fn highlight(&self, chain: &LocatorChain, duration_ms: u64) -> Result<bool> {
        let body = format!(
            "const old = el.style.border; el.style.border = '3px solid red'; \
             el.scrollIntoView({{ block: 'center' }}); \
             setTimeout(() => {{ el.style.border = old; }}, {}); return true;",
            duration_ms
        );
        let js = with_element(&chain.js_find(), &body);
        Ok(self.eval(js).await?.as_bool().unwrap_or(false))
    }

    /// `document.readyState`
    pub async fn ready_state(&self) -> Result<String> {
        let state: Option<String> = self.eval_as("document.readyState").await?;
        Ok(state.unwrap_or_default())
    }
}
