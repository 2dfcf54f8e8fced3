//! 文档树抽象
//!
//! 核心流程只通过 [`DocumentTree`] 读写页面结构，不关心树来自真实页面的镜像还是测试夹具。

use serde::{Deserialize, Serialize};

/// 树节点句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// 写入节点的一段内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inline {
    /// 纯文本
    Text { text: String },
    /// 带 class 的 `<span>`
    Styled { class: String, text: String },
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text { text: text.into() }
    }

    pub fn styled(class: impl Into<String>, text: impl Into<String>) -> Self {
        Inline::Styled {
            class: class.into(),
            text: text.into(),
        }
    }
}

/// 对树的一次写操作，按发生顺序记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeWrite {
    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },
    ReplaceToken {
        node: NodeId,
        token: String,
        replacement: Inline,
    },
    /// 按 id 找到或创建元素，然后整体覆盖其内容
    RenderById {
        id: String,
        tag: String,
        content: Vec<Inline>,
    },
}

/// 文档树的读写能力
///
/// 只读部分描述"候选节点"：标签、class、属性、文本和结构关系。
/// 写入部分只有修补器会用到。
pub trait DocumentTree {
    fn root(&self) -> NodeId;

    /// 元素标签（小写）；文本节点和片段节点返回 `None`
    fn tag(&self, node: NodeId) -> Option<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> &[NodeId];

    /// 封装子树（shadow root）
    fn shadow_root(&self, node: NodeId) -> Option<NodeId>;

    /// 节点渲染后的文本，块级元素之间以换行分隔
    fn text_content(&self, node: NodeId) -> String;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    /// 将节点文本中第一次出现的 `token` 替换为 `replacement`，未找到时返回 `false`
    fn replace_token(&mut self, node: NodeId, token: &str, replacement: Inline) -> bool;

    /// 按 id 查找元素，不存在时在 `body`（或根）下创建，然后整体覆盖内容
    fn render_by_id(&mut self, id: &str, tag: &str, content: &[Inline]) -> NodeId;

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .map(|v| v.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    fn classes(&self, node: NodeId) -> Vec<String> {
        self.attribute(node, "class")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// `ancestor` 是否包含 `node`（含自身），不跨越 shadow 边界向上
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// 先序遍历 `scope` 的后代（不含自身），不进入嵌套的 shadow root
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }
}
