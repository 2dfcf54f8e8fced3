//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"和"接收页面回调"的能力

use std::sync::Arc;

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::js_protocol::runtime::{AddBindingParams, EventBindingCalled};
use chromiumoxide::Page;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{AppError, BrowserError};

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 暴露页面 → Rust 的 binding 回调流
/// - 不认识 UE / 成绩
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self
            .page
            .evaluate(js_code.into())
            .await
            .map_err(script_failed)?;
        let json_value = result.into_value().map_err(unexpected_result)?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value).map_err(unexpected_result)?;
        Ok(typed_value)
    }

    /// 在页面注册名为 `name` 的全局函数，页面调用它时会产生 binding 事件
    pub async fn add_binding(&self, name: &str) -> Result<()> {
        self.page
            .execute(AddBindingParams::new(name))
            .await
            .map_err(script_failed)?;
        Ok(())
    }

    /// 注册在每个新文档加载时执行的脚本
    pub async fn add_init_script(&self, js_code: impl Into<String>) -> Result<()> {
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(js_code.into()))
            .await
            .map_err(script_failed)?;
        Ok(())
    }

    /// 订阅名为 `name` 的 binding 调用，产出每次调用的 payload
    pub async fn binding_events(&self, name: &str) -> Result<impl Stream<Item = String>> {
        let name = name.to_string();
        let events = self
            .page
            .event_listener::<EventBindingCalled>()
            .await
            .map_err(script_failed)?;
        Ok(events.filter_map(move |event: Arc<EventBindingCalled>| {
            let payload = (event.name == name).then(|| event.payload.clone());
            async move { payload }
        }))
    }
}

fn script_failed(err: chromiumoxide::error::CdpError) -> AppError {
    AppError::Browser(BrowserError::ScriptExecutionFailed {
        source: Box::new(err),
    })
}

fn unexpected_result(err: serde_json::Error) -> AppError {
    AppError::Browser(BrowserError::UnexpectedScriptResult {
        source: Box::new(err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_script_result_is_browser_error() {
        let err = serde_json::from_value::<usize>(serde_json::json!("nope")).unwrap_err();
        let err = unexpected_result(err);
        assert!(matches!(
            err,
            AppError::Browser(BrowserError::UnexpectedScriptResult { .. })
        ));
        assert!(err.to_string().starts_with("浏览器错误: 脚本返回值无法解析"));
    }
}
