//! 内存文档树
//!
//! 基于 arena 的简化 DOM：文档、元素、文本和 shadow root 四种节点。
//! 页面模式下每次扫描都从快照重建一棵；测试中直接手工搭建。
//! 所有写操作都会记入日志（[`TreeWrite`]），页面桥接层据此把修改回放到真实页面。

use std::collections::HashMap;

use crate::infrastructure::tree::{DocumentTree, Inline, NodeId, TreeWrite};
use crate::models::snapshot::SnapshotNode;
use crate::utils::text_fingerprint;

/// 渲染文本时前后换行的块级标签
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody", "td",
    "tfoot", "th", "thead", "tr", "ul",
];

/// 从快照宿主元素出发定位节点的一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
    /// 第 n 个（快照中保留的）子节点
    Child(usize),
    /// 进入 shadow root
    Shadow,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    ShadowRoot {
        host: NodeId,
    },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadow: Option<NodeId>,
}

/// 内存文档树
#[derive(Debug, Clone)]
pub struct MemoryTree {
    nodes: Vec<Node>,
    writes: Vec<TreeWrite>,
    snapshot_paths: HashMap<NodeId, Vec<PathStep>>,
    /// 快照节点第一次被写入前的文本指纹
    fingerprints: HashMap<NodeId, String>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// 只有文档根节点的空树
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                shadow: None,
            }],
            writes: Vec::new(),
            snapshot_paths: HashMap::new(),
            fingerprints: HashMap::new(),
        }
    }

    /// 由快照重建：`document > body > host`，并记录每个节点相对宿主的路径
    pub fn from_snapshot(host: Option<&SnapshotNode>) -> Self {
        let mut tree = Self::new();
        let root = tree.root();
        let body = tree.append_element(root, "body", &[]);
        if let Some(host) = host {
            tree.build_snapshot_node(body, host, Vec::new());
        }
        tree
    }

    fn build_snapshot_node(&mut self, parent: NodeId, node: &SnapshotNode, path: Vec<PathStep>) {
        match node {
            SnapshotNode::Text { text } => {
                let id = self.append_text(parent, text);
                self.snapshot_paths.insert(id, path);
            }
            SnapshotNode::Element {
                tag,
                attrs,
                children,
                shadow,
            } => {
                let attrs: Vec<(&str, &str)> =
                    attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                let id = self.append_element(parent, tag, &attrs);
                self.snapshot_paths.insert(id, path.clone());

                if let Some(shadow_children) = shadow {
                    let shadow_root = self.attach_shadow(id);
                    let mut shadow_path = path.clone();
                    shadow_path.push(PathStep::Shadow);
                    self.snapshot_paths.insert(shadow_root, shadow_path.clone());
                    for (i, child) in shadow_children.iter().enumerate() {
                        let mut child_path = shadow_path.clone();
                        child_path.push(PathStep::Child(i));
                        self.build_snapshot_node(shadow_root, child, child_path);
                    }
                }

                for (i, child) in children.iter().enumerate() {
                    let mut child_path = path.clone();
                    child_path.push(PathStep::Child(i));
                    self.build_snapshot_node(id, child, child_path);
                }
            }
        }
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
            shadow: None,
        });
        id
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let kind = NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let id = self.push(kind, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.push(NodeKind::Text(text.to_string()), Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// 为元素创建（或返回已有的）shadow root
    pub fn attach_shadow(&mut self, host: NodeId) -> NodeId {
        if let Some(existing) = self.nodes[host.0].shadow {
            return existing;
        }
        let id = self.push(NodeKind::ShadowRoot { host }, None);
        self.nodes[host.0].shadow = Some(id);
        id
    }

    /// shadow root 所属的宿主元素
    pub fn shadow_host(&self, node: NodeId) -> Option<NodeId> {
        match self.nodes.get(node.0)?.kind {
            NodeKind::ShadowRoot { host } => Some(host),
            _ => None,
        }
    }

    /// 节点在原始快照中相对宿主元素的路径；后来创建的节点没有路径
    pub fn snapshot_path(&self, node: NodeId) -> Option<&[PathStep]> {
        self.snapshot_paths.get(&node).map(Vec::as_slice)
    }

    /// 快照节点被本次扫描修改之前的文本指纹（见 [`text_fingerprint`]）；未被写入的节点没有
    pub fn snapshot_fingerprint(&self, node: NodeId) -> Option<&str> {
        self.fingerprints.get(&node).map(String::as_str)
    }

    fn remember_fingerprint(&mut self, node: NodeId) {
        if self.snapshot_paths.contains_key(&node) && !self.fingerprints.contains_key(&node) {
            let fingerprint = text_fingerprint(&self.text_content(node));
            self.fingerprints.insert(node, fingerprint);
        }
    }

    /// 按 id 查找（只在挂在文档上的节点中查找，含 shadow 子树）
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            if self.attribute(node, "id") == Some(id) {
                return Some(node);
            }
            if let Some(shadow) = self.nodes[node.0].shadow {
                stack.push(shadow);
            }
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        None
    }

    /// 已记录的写操作数量
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// 取出并清空写操作日志
    pub fn take_writes(&mut self) -> Vec<TreeWrite> {
        std::mem::take(&mut self.writes)
    }

    fn render_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { tag, .. } => {
                if tag == "br" {
                    out.push('\n');
                    return;
                }
                let block = BLOCK_TAGS.contains(&tag.as_str());
                if block {
                    out.push('\n');
                }
                for &child in &self.nodes[node.0].children {
                    self.render_text(child, out);
                }
                if block {
                    out.push('\n');
                }
            }
            NodeKind::Document | NodeKind::ShadowRoot { .. } => {
                for &child in &self.nodes[node.0].children {
                    self.render_text(child, out);
                }
            }
        }
    }

    fn inline_nodes(&mut self, parent: NodeId, content: &Inline) -> NodeId {
        match content {
            Inline::Text { text } => self.push(NodeKind::Text(text.clone()), Some(parent)),
            Inline::Styled { class, text } => {
                let span = self.push(
                    NodeKind::Element {
                        tag: "span".to_string(),
                        attrs: vec![("class".to_string(), class.clone())],
                    },
                    Some(parent),
                );
                let inner = self.push(NodeKind::Text(text.clone()), Some(span));
                self.nodes[span.0].children.push(inner);
                span
            }
        }
    }

    fn detach_children(&mut self, node: NodeId) {
        for child in std::mem::take(&mut self.nodes[node.0].children) {
            self.nodes[child.0].parent = None;
        }
    }
}

impl DocumentTree for MemoryTree {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    fn shadow_root(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.shadow
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        if node.0 < self.nodes.len() {
            self.render_text(node, &mut out);
        }
        out
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.remember_fingerprint(node);
        let Some(Node {
            kind: NodeKind::Element { attrs, .. },
            ..
        }) = self.nodes.get_mut(node.0)
        else {
            return;
        };
        match attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
        self.writes.push(TreeWrite::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn replace_token(&mut self, node: NodeId, token: &str, replacement: Inline) -> bool {
        if token.is_empty() || node.0 >= self.nodes.len() {
            return false;
        }

        let mut candidates = vec![node];
        candidates.extend(self.descendants(node));
        let found = candidates.into_iter().find_map(|n| match &self.nodes[n.0].kind {
            NodeKind::Text(text) => text.find(token).map(|pos| (n, text.clone(), pos)),
            _ => None,
        });
        let Some((text_node, text, pos)) = found else {
            return false;
        };
        let Some(parent) = self.nodes[text_node.0].parent else {
            return false;
        };
        self.remember_fingerprint(node);

        let before = &text[..pos];
        let after = &text[pos + token.len()..];
        let mut pieces = Vec::new();
        if !before.is_empty() {
            pieces.push(self.inline_nodes(parent, &Inline::text(before)));
        }
        pieces.push(self.inline_nodes(parent, &replacement));
        if !after.is_empty() {
            pieces.push(self.inline_nodes(parent, &Inline::text(after)));
        }

        let siblings = &mut self.nodes[parent.0].children;
        if let Some(index) = siblings.iter().position(|&c| c == text_node) {
            siblings.splice(index..=index, pieces);
        }
        self.nodes[text_node.0].parent = None;

        self.writes.push(TreeWrite::ReplaceToken {
            node,
            token: token.to_string(),
            replacement,
        });
        true
    }

    fn render_by_id(&mut self, id: &str, tag: &str, content: &[Inline]) -> NodeId {
        let target = match self.element_by_id(id) {
            Some(existing) => existing,
            None => {
                let root = self.root();
                let body = self
                    .children(root)
                    .iter()
                    .copied()
                    .find(|&c| self.tag(c) == Some("body"))
                    .unwrap_or(root);
                self.append_element(body, tag, &[("id", id)])
            }
        };

        self.detach_children(target);
        for piece in content {
            let child = self.inline_nodes(target, piece);
            self.nodes[target.0].children.push(child);
        }

        self.writes.push(TreeWrite::RenderById {
            id: id.to_string(),
            tag: tag.to_string(),
            content: content.to_vec(),
        });
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_breaks_blocks() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let div = tree.append_element(root, "div", &[]);
        let title = tree.append_element(div, "h3", &[]);
        tree.append_text(title, "UE 1.1  Développer");
        let span = tree.append_element(div, "span", &[]);
        tree.append_text(span, "Moyenne ~");

        let text = tree.text_content(div);
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["UE 1.1  Développer", "Moyenne ~"]);
    }

    #[test]
    fn test_replace_token_splits_text() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let div = tree.append_element(root, "div", &[]);
        tree.append_text(div, "Moyenne : ~ / 20");

        assert!(tree.replace_token(div, "~", Inline::styled("pass", "13.33")));
        assert_eq!(tree.text_content(div), "\nMoyenne : 13.33 / 20\n");

        let span = tree.children(div)[1];
        assert_eq!(tree.tag(span), Some("span"));
        assert!(tree.has_class(span, "pass"));
        assert_eq!(tree.write_count(), 1);

        assert!(!tree.replace_token(div, "~", Inline::text("x")));
        assert_eq!(tree.write_count(), 1);
    }

    #[test]
    fn test_render_by_id_reuses_element() {
        let mut tree = MemoryTree::from_snapshot(None);
        let first = tree.render_by_id("summary", "div", &[Inline::text("a")]);
        let second = tree.render_by_id("summary", "div", &[Inline::text("b"), Inline::text("c")]);

        assert_eq!(first, second);
        assert_eq!(tree.text_content(first), "\nbc\n");
        let body = tree.children(tree.root())[0];
        assert_eq!(tree.children(body), &[first]);
    }

    #[test]
    fn test_snapshot_paths() {
        let host = SnapshotNode::element("releve-but", &[], vec![SnapshotNode::text("light")])
            .with_shadow(vec![
                SnapshotNode::text("x"),
                SnapshotNode::element("div", &[("class", "ue")], vec![]),
            ]);
        let tree = MemoryTree::from_snapshot(Some(&host));

        let body = tree.children(tree.root())[0];
        let host_id = tree.children(body)[0];
        let shadow = tree.shadow_root(host_id).unwrap();
        let ue = tree.children(shadow)[1];

        assert_eq!(tree.snapshot_path(host_id), Some(&[][..]));
        assert_eq!(
            tree.snapshot_path(ue),
            Some(&[PathStep::Shadow, PathStep::Child(1)][..])
        );
        assert_eq!(tree.shadow_host(shadow), Some(host_id));
        assert_eq!(tree.text_content(host_id), "light");
    }

    #[test]
    fn test_fingerprint_is_taken_before_first_write() {
        let host = SnapshotNode::element("releve-but", &[], vec![]).with_shadow(vec![
            SnapshotNode::element(
                "div",
                &[("class", "ue")],
                vec![
                    SnapshotNode::element("h3", &[], vec![SnapshotNode::text("UE 1.1")]),
                    SnapshotNode::text(" Moyenne ~ "),
                ],
            ),
        ]);
        let mut tree = MemoryTree::from_snapshot(Some(&host));
        let body = tree.children(tree.root())[0];
        let host_id = tree.children(body)[0];
        let ue = tree.children(tree.shadow_root(host_id).unwrap())[0];

        assert_eq!(tree.snapshot_fingerprint(ue), None);
        tree.replace_token(ue, "~", Inline::text("12.00"));
        tree.set_attribute(ue, "data-scodoc-patched", "true");
        assert_eq!(tree.snapshot_fingerprint(ue), Some("UE1.1Moyenne~"));
    }
}
