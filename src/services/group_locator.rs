//! UE 定位服务 - 业务能力层
//!
//! 在宿主元素（优先其 shadow root）里按文档顺序找出 UE 标题，
//! 经过一组有序的过滤规则，再为每个保留的 UE 划分评估行。

use std::collections::HashMap;

use tracing::debug;

use crate::config::ScanProfile;
use crate::error::AppResult;
use crate::infrastructure::{DocumentTree, NodeId, Selector};
use crate::services::pattern_extractor::ItemText;
use crate::utils::logging::truncate_text;
use crate::utils::{clean_text, first_line};

/// 一个 UE 标题候选
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCandidate {
    pub node: NodeId,
    pub classes: Vec<String>,
    /// 标题首行清理后的文本
    pub label: String,
}

/// UE 标题过滤规则，返回 `false` 表示排除
pub trait GroupFilter: Send + Sync {
    fn name(&self) -> &'static str;

    fn accept(&self, candidate: &HeaderCandidate) -> bool;
}

/// 排除奖励 UE
pub struct BonusFilter {
    class: String,
}

impl BonusFilter {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
        }
    }
}

impl GroupFilter for BonusFilter {
    fn name(&self) -> &'static str {
        "bonus"
    }

    fn accept(&self, candidate: &HeaderCandidate) -> bool {
        !candidate.classes.iter().any(|c| c == &self.class)
    }
}

/// 标题必须以指定记号开头（不区分大小写）
pub struct NameTokenFilter {
    token: String,
}

impl NameTokenFilter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().to_lowercase(),
        }
    }
}

impl GroupFilter for NameTokenFilter {
    fn name(&self) -> &'static str {
        "name-token"
    }

    fn accept(&self, candidate: &HeaderCandidate) -> bool {
        candidate.label.to_lowercase().starts_with(&self.token)
    }
}

/// 定位结果：一个保留下来的 UE 及其评估行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedGroup {
    pub header: NodeId,
    pub identifier: String,
    pub items: Vec<NodeId>,
}

/// UE 定位器
pub struct GroupLocator {
    host: Selector,
    header: Selector,
    item: Selector,
    coef: Option<Selector>,
    note: Option<Selector>,
    filters: Vec<Box<dyn GroupFilter>>,
}

impl GroupLocator {
    /// 默认过滤顺序：先排除奖励 UE，再检查名称记号
    pub fn from_profile(profile: &ScanProfile) -> AppResult<Self> {
        Ok(Self {
            host: Selector::parse(&profile.host_selector)?,
            header: Selector::parse(&profile.header_selector)?,
            item: Selector::parse(&profile.item_selector)?,
            coef: profile.coef_selector.as_deref().map(Selector::parse).transpose()?,
            note: profile.note_selector.as_deref().map(Selector::parse).transpose()?,
            filters: vec![
                Box::new(BonusFilter::new(&profile.bonus_class)),
                Box::new(NameTokenFilter::new(&profile.group_name_token)),
            ],
        })
    }

    /// 搜索范围：宿主元素的 shadow root，没有则是宿主本身
    pub fn search_root<T: DocumentTree + ?Sized>(&self, tree: &T) -> Option<NodeId> {
        let host = tree
            .descendants(tree.root())
            .into_iter()
            .find(|&n| self.host.matches(tree, n))?;
        Some(tree.shadow_root(host).unwrap_or(host))
    }

    /// 按文档顺序列出所有标题（不做过滤）；嵌套在另一个标题里的匹配视为重复
    pub fn headers<T: DocumentTree + ?Sized>(&self, tree: &T, scope: NodeId) -> Vec<NodeId> {
        let mut headers: Vec<NodeId> = Vec::new();
        for node in tree.descendants(scope) {
            if !self.header.matches(tree, node) {
                continue;
            }
            if headers.iter().any(|&h| tree.contains(h, node)) {
                continue;
            }
            headers.push(node);
        }
        headers
    }

    pub fn candidate<T: DocumentTree + ?Sized>(&self, tree: &T, node: NodeId) -> HeaderCandidate {
        HeaderCandidate {
            node,
            classes: tree.classes(node),
            label: first_line(&tree.text_content(node)),
        }
    }

    /// 找出所有通过过滤的 UE；宿主不存在时返回空
    pub fn locate<T: DocumentTree + ?Sized>(&self, tree: &T) -> Vec<LocatedGroup> {
        let Some(scope) = self.search_root(tree) else {
            debug!("未找到宿主元素 {}", self.host);
            return Vec::new();
        };

        let order: HashMap<NodeId, usize> = tree
            .descendants(scope)
            .into_iter()
            .enumerate()
            .map(|(i, n)| (n, i))
            .collect();
        let position = |n: NodeId| order.get(&n).copied().unwrap_or(usize::MAX);

        let headers = self.headers(tree, scope);
        let mut groups = Vec::new();

        for (index, &header) in headers.iter().enumerate() {
            let candidate = self.candidate(tree, header);
            if let Some(filter) = self.filters.iter().find(|f| !f.accept(&candidate)) {
                debug!(
                    "跳过 UE '{}'（规则: {}）",
                    truncate_text(&candidate.label, 40),
                    filter.name()
                );
                continue;
            }
            let Some(container) = tree.parent(header) else {
                continue;
            };

            let start = position(header);
            // 下一个标题（包括被排除的）就是本 UE 的边界
            let end = headers
                .get(index + 1)
                .map(|&h| position(h))
                .unwrap_or(usize::MAX);

            let mut items: Vec<NodeId> = Vec::new();
            for node in tree.descendants(container) {
                let pos = position(node);
                if pos <= start || pos >= end || tree.contains(header, node) {
                    continue;
                }
                if !self.item.matches(tree, node) {
                    continue;
                }
                if items.iter().any(|&kept| tree.contains(kept, node)) {
                    continue;
                }
                items.push(node);
            }

            groups.push(LocatedGroup {
                header,
                identifier: candidate.label,
                items,
            });
        }

        groups
    }

    /// 读取一行评估的文本以及成绩/系数子节点的文本
    ///
    /// 整行文本按结构拼出，跳过成绩/系数子节点，它们的文本只出现在各自的字段里
    pub fn item_text<T: DocumentTree + ?Sized>(&self, tree: &T, item: NodeId) -> ItemText {
        let find = |selector: &Option<Selector>| {
            let selector = selector.as_ref()?;
            tree.descendants(item)
                .into_iter()
                .find(|&n| selector.matches(tree, n))
        };
        let note = find(&self.note);
        let coef = find(&self.coef);
        let excluded: Vec<NodeId> = note.into_iter().chain(coef).collect();

        let mut text = String::new();
        text_outside(tree, item, &excluded, &mut text);

        ItemText {
            text,
            note_text: note.map(|n| clean_text(&tree.text_content(n))),
            coef_text: coef.map(|n| clean_text(&tree.text_content(n))),
        }
    }
}

/// `node` 的文本，`excluded` 中的子树用换行代替
fn text_outside<T: DocumentTree + ?Sized>(
    tree: &T,
    node: NodeId,
    excluded: &[NodeId],
    out: &mut String,
) {
    for &child in tree.children(node) {
        if excluded.contains(&child) {
            out.push('\n');
        } else if excluded.iter().any(|&e| tree.contains(child, e)) {
            out.push('\n');
            text_outside(tree, child, excluded, out);
            out.push('\n');
        } else {
            out.push_str(&tree.text_content(child));
        }
    }
}
