//! 页面快照
//!
//! 页面中宿主元素子树的 JSON 序列化形式。浏览器端脚本和离线快照文件使用同一格式：
//!
//! ```json
//! { "host": { "tag": "releve-but", "attrs": {}, "shadow": [ { "tag": "div", "children": [ { "text": "UE 1.1" } ] } ] } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{AppResult, SnapshotError};

/// 快照中的一个节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotNode {
    Text {
        text: String,
    },
    Element {
        tag: String,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<SnapshotNode>,
        /// 开放的 shadow root 子节点
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shadow: Option<Vec<SnapshotNode>>,
    },
}

impl SnapshotNode {
    pub fn text(text: impl Into<String>) -> Self {
        SnapshotNode::Text { text: text.into() }
    }

    pub fn element(tag: &str, attrs: &[(&str, &str)], children: Vec<SnapshotNode>) -> Self {
        SnapshotNode::Element {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
            shadow: None,
        }
    }

    /// 给元素挂上 shadow root 内容；对文本节点无效
    pub fn with_shadow(mut self, content: Vec<SnapshotNode>) -> Self {
        if let SnapshotNode::Element { shadow, .. } = &mut self {
            *shadow = Some(content);
        }
        self
    }
}

/// 一次快照：宿主元素不存在时 `host` 为空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub host: Option<SnapshotNode>,
}

/// 从 JSON 文件加载快照
pub async fn load_snapshot(path: &Path) -> AppResult<PageSnapshot> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| SnapshotError::ReadFailed {
            path: path.display().to_string(),
            source: e,
        })?;

    let snapshot = serde_json::from_str(&content).map_err(|e| SnapshotError::JsonParseFailed {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(snapshot)
}
