//! 页面桥接 - 基础设施层
//!
//! 真实页面与内存树之间的往返：
//! 1. `install_observer`：在页面里挂 MutationObserver，变化通过 binding 回调到 Rust
//! 2. `snapshot`：把宿主元素子树（含开放的 shadow root）序列化成 [`PageSnapshot`]
//! 3. `apply`：把内存树记录的写操作按快照路径回放到页面

use anyhow::Result;
use futures::Stream;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::config::ScanProfile;
use crate::infrastructure::js_executor::JsExecutor;
use crate::infrastructure::memory_tree::{MemoryTree, PathStep};
use crate::infrastructure::tree::TreeWrite;
use crate::models::snapshot::PageSnapshot;

/// 页面调用的 binding 名称
pub const MUTATION_BINDING: &str = "__scodocPatcherMutation";

/// 页面端与 Rust 端共用的节点过滤规则：快照路径只计入这些子节点
const KEEP_NODE_JS: &str = r#"const keep = (n) => n.nodeType === 1
    ? !['SCRIPT', 'STYLE', 'TEMPLATE'].includes(n.tagName)
    : (n.nodeType === 3 && n.textContent.trim() !== '');"#;

/// 页面桥接
pub struct PageBridge {
    executor: JsExecutor,
    host_selector: String,
    marker_attribute: String,
    summary_id: String,
}

impl PageBridge {
    pub fn new(executor: JsExecutor, profile: &ScanProfile) -> Self {
        Self {
            executor,
            host_selector: profile.host_selector.clone(),
            marker_attribute: profile.marker_attribute.clone(),
            summary_id: profile.summary_id.clone(),
        }
    }

    /// 注册 binding 并订阅变化事件
    pub async fn mutation_events(&self) -> Result<impl Stream<Item = String>> {
        self.executor.add_binding(MUTATION_BINDING).await?;
        self.executor.binding_events(MUTATION_BINDING).await
    }

    /// 安装（或补挂 shadow root 的）MutationObserver；首次安装返回 `true`
    ///
    /// 只发生在总平均节点内部的变化不回调：该节点每次扫描都会重绘，否则会无休止地触发扫描。
    pub async fn install_observer(&self) -> Result<bool> {
        let js_code = observer_script(&self.host_selector, &self.summary_id);
        let installed = self.executor.eval_as::<bool>(js_code).await?;
        debug!("MutationObserver 安装结果: {}", installed);
        Ok(installed)
    }

    /// 让页面每次加载新文档时都自动安装观察者（整页跳转后 `window` 上的观察者会丢失）
    pub async fn persist_observer(&self) -> Result<()> {
        let js_code = observer_script(&self.host_selector, &self.summary_id);
        self.executor.add_init_script(js_code).await
    }

    /// 序列化宿主元素子树
    pub async fn snapshot(&self) -> Result<PageSnapshot> {
        let js_code = format!(
            r#"
            ((hostSel) => {{
                {keep}
                const ser = (n) => {{
                    if (n.nodeType === 3) return {{ text: n.textContent }};
                    const attrs = {{}};
                    for (const a of n.attributes) attrs[a.name] = a.value;
                    const out = {{
                        tag: n.tagName.toLowerCase(),
                        attrs,
                        children: Array.from(n.childNodes).filter(keep).map(ser),
                    }};
                    if (n.shadowRoot) out.shadow = Array.from(n.shadowRoot.childNodes).filter(keep).map(ser);
                    return out;
                }};
                const host = document.querySelector(hostSel);
                return {{ host: host ? ser(host) : null }};
            }})({host})
            "#,
            keep = KEEP_NODE_JS,
            host = json!(self.host_selector),
        );
        self.executor.eval_as::<PageSnapshot>(js_code).await
    }

    /// 把写操作回放到页面，返回页面端实际生效的操作数
    pub async fn apply(&self, tree: &MemoryTree, writes: &[TreeWrite]) -> Result<usize> {
        let ops = encode_writes(tree, writes);
        if ops.is_empty() {
            return Ok(0);
        }

        let js_code = format!(
            r#"
            ((ops, hostSel, marker) => {{
                {keep}
                const host = document.querySelector(hostSel);
                const resolve = (path) => {{
                    let n = host;
                    for (const step of path) {{
                        if (!n) return null;
                        n = step === 'shadow' ? n.shadowRoot : Array.from(n.childNodes).filter(keep)[step];
                    }}
                    return n || null;
                }};
                const make = (piece) => {{
                    if (piece.kind !== 'styled') return document.createTextNode(piece.text);
                    const span = document.createElement('span');
                    span.className = piece.class;
                    span.textContent = piece.text;
                    return span;
                }};
                const text = (n) => n.nodeType === 3
                    ? n.textContent
                    : Array.from(n.childNodes).filter(keep).map(text).join('');
                // 快照之后页面可能重排，路径指向的节点文本必须和快照时一致
                const same = (n, expect) => expect == null || text(n).replace(/\s+/g, '') === expect;
                const verified = new Set();
                let applied = 0;
                for (const op of ops) {{
                    if (op.op === 'set_attribute') {{
                        const n = resolve(op.path);
                        if (!n || !n.setAttribute) continue;
                        if (!verified.has(n) && !same(n, op.expect)) continue;
                        n.setAttribute(op.name, op.value);
                        applied++;
                    }} else if (op.op === 'replace_token') {{
                        const n = resolve(op.path);
                        if (!n || (n.hasAttribute && n.hasAttribute(marker))) continue;
                        if (!same(n, op.expect)) continue;
                        const walker = document.createTreeWalker(n, NodeFilter.SHOW_TEXT);
                        let t;
                        while ((t = walker.nextNode())) {{
                            const i = t.textContent.indexOf(op.token);
                            if (i < 0) continue;
                            const rest = t.splitText(i);
                            rest.textContent = rest.textContent.slice(op.token.length);
                            rest.parentNode.insertBefore(make(op.replacement), rest);
                            verified.add(n);
                            applied++;
                            break;
                        }}
                    }} else if (op.op === 'render_by_id') {{
                        let n = document.getElementById(op.id);
                        if (!n) {{
                            n = document.createElement(op.tag);
                            n.id = op.id;
                            (document.body || document.documentElement).appendChild(n);
                        }}
                        n.replaceChildren(...op.content.map(make));
                        applied++;
                    }}
                }}
                return applied;
            }})({ops}, {host}, {marker})
            "#,
            keep = KEEP_NODE_JS,
            ops = JsonValue::Array(ops),
            host = json!(self.host_selector),
            marker = json!(self.marker_attribute),
        );
        self.executor.eval_as::<usize>(js_code).await
    }
}

/// 观察者脚本：已安装时只补挂 shadow root
fn observer_script(host_selector: &str, summary_id: &str) -> String {
    format!(
        r#"
        ((binding, hostSel, summaryId) => {{
            if (window.__scodocPatcherObserver) {{
                window.__scodocPatcherObserver.watchShadow();
                return false;
            }}
            const opts = {{ childList: true, subtree: true, characterData: true }};
            const watched = new WeakSet();
            const notify = () => {{
                try {{ window[binding]('mutation'); }} catch (e) {{}}
            }};
            const isOwn = (record) => {{
                const summary = document.getElementById(summaryId);
                return !!summary && summary.contains(record.target);
            }};
            const observer = new MutationObserver((records) => {{
                watchShadow();
                if (!records.every(isOwn)) notify();
            }});
            const watchShadow = () => {{
                const host = document.querySelector(hostSel);
                if (host && host.shadowRoot && !watched.has(host.shadowRoot)) {{
                    watched.add(host.shadowRoot);
                    observer.observe(host.shadowRoot, opts);
                }}
            }};
            observer.observe(document, opts);
            watchShadow();
            window.__scodocPatcherObserver = {{ watchShadow }};
            return true;
        }})({binding}, {host}, {summary})
        "#,
        binding = json!(MUTATION_BINDING),
        host = json!(host_selector),
        summary = json!(summary_id),
    )
}

fn encode_path(path: &[PathStep]) -> JsonValue {
    path.iter()
        .map(|step| match step {
            PathStep::Child(i) => json!(i),
            PathStep::Shadow => json!("shadow"),
        })
        .collect()
}

/// 把写操作编码成页面脚本使用的 JSON；没有快照路径的节点无法在页面中定位，直接丢弃
///
/// 节点类操作带上快照时的文本指纹（`expect`），页面端据此确认路径仍指向同一个节点
pub fn encode_writes(tree: &MemoryTree, writes: &[TreeWrite]) -> Vec<JsonValue> {
    writes
        .iter()
        .filter_map(|write| match write {
            TreeWrite::SetAttribute { node, name, value } => {
                let Some(path) = tree.snapshot_path(*node) else {
                    debug!("节点 {:?} 不在快照中，跳过属性写入", node);
                    return None;
                };
                Some(json!({
                    "op": "set_attribute",
                    "path": encode_path(path),
                    "expect": tree.snapshot_fingerprint(*node),
                    "name": name,
                    "value": value,
                }))
            }
            TreeWrite::ReplaceToken {
                node,
                token,
                replacement,
            } => {
                let Some(path) = tree.snapshot_path(*node) else {
                    debug!("节点 {:?} 不在快照中，跳过占位符替换", node);
                    return None;
                };
                Some(json!({
                    "op": "replace_token",
                    "path": encode_path(path),
                    "expect": tree.snapshot_fingerprint(*node),
                    "token": token,
                    "replacement": replacement,
                }))
            }
            TreeWrite::RenderById { id, tag, content } => Some(json!({
                "op": "render_by_id",
                "id": id,
                "tag": tag,
                "content": content,
            })),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::tree::{DocumentTree, Inline};
    use crate::models::snapshot::SnapshotNode;

    #[test]
    fn test_encode_writes_uses_snapshot_paths() {
        let host = SnapshotNode::element("releve-but", &[], vec![]).with_shadow(vec![
            SnapshotNode::element("div", &[("class", "ue")], vec![SnapshotNode::text("UE 1 ~")]),
        ]);
        let mut tree = MemoryTree::from_snapshot(Some(&host));
        let body = tree.children(tree.root())[0];
        let host_id = tree.children(body)[0];
        let shadow = tree.shadow_root(host_id).unwrap();
        let ue = tree.children(shadow)[0];

        tree.replace_token(ue, "~", Inline::styled("pass", "12.00"));
        tree.set_attribute(ue, "data-scodoc-patched", "true");
        tree.render_by_id("summary", "div", &[Inline::text("ok")]);
        let writes = tree.take_writes();

        let ops = encode_writes(&tree, &writes);
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0]["op"], "replace_token");
        assert_eq!(ops[0]["path"], json!(["shadow", 0]));
        assert_eq!(ops[0]["replacement"]["kind"], "styled");
        // 指纹是写入前的文本，两个操作相同
        assert_eq!(ops[0]["expect"], "UE1~");
        assert_eq!(ops[1]["expect"], "UE1~");
        assert_eq!(ops[1]["name"], "data-scodoc-patched");
        assert_eq!(ops[2]["content"][0]["text"], "ok");
    }

    #[test]
    fn test_observer_script_is_guarded() {
        let script = observer_script("releve-but", "scodoc-patcher-summary");
        assert!(script.contains("if (window.__scodocPatcherObserver)"));
        assert!(script.contains(r#"("__scodocPatcherMutation", "releve-but", "scodoc-patcher-summary")"#));
    }

    #[test]
    fn test_nodes_created_after_snapshot_are_dropped() {
        let mut tree = MemoryTree::from_snapshot(None);
        let root = tree.root();
        let extra = tree.append_element(root, "div", &[]);
        tree.set_attribute(extra, "x", "1");
        let writes = tree.take_writes();
        assert!(encode_writes(&tree, &writes).is_empty());
    }
}
