//! 简单选择器
//!
//! 只支持不带组合符的复合选择器及其逗号列表：
//! `tag`、`.class`、`#id`、`[attr]`、`[attr=value]` 以及它们的组合，如 `div.ue.bonus`。
//! 页面结构的匹配规则由这些声明式对象表达，可以脱离真实页面单独测试。

use std::fmt;

use crate::error::{AppError, AppResult};
use crate::infrastructure::tree::{DocumentTree, NodeId};

/// 单个复合选择器
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches<T: DocumentTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        let Some(tag) = tree.tag(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if tree.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| tree.has_class(node, c)) {
            return false;
        }
        self.attributes.iter().all(|(name, value)| {
            match (tree.attribute(node, name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

/// 逗号分隔的选择器列表，任一分支匹配即匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> AppResult<Self> {
        let mut alternatives = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(AppError::invalid_selector(input, "空的选择器分支"));
            }
            if part.chars().any(char::is_whitespace) || part.contains('>') {
                return Err(AppError::invalid_selector(input, "不支持组合符"));
            }
            alternatives.push(parse_compound(input, part)?);
        }
        Ok(Self {
            source: input.to_string(),
            alternatives,
        })
    }

    pub fn matches<T: DocumentTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches(tree, node))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_compound(whole: &str, part: &str) -> AppResult<Compound> {
    let mut compound = Compound::default();
    let mut rest = part;

    let tag_end = rest.find(['.', '#', '[']).unwrap_or(rest.len());
    if tag_end > 0 {
        let tag = &rest[..tag_end];
        if tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
    }
    rest = &rest[tag_end..];

    while let Some(first) = rest.chars().next() {
        match first {
            '.' | '#' => {
                let body = &rest[1..];
                let end = body.find(['.', '#', '[']).unwrap_or(body.len());
                let name = &body[..end];
                if name.is_empty() {
                    let what = if first == '.' { "空的 class 名" } else { "空的 id" };
                    return Err(AppError::invalid_selector(whole, what));
                }
                if first == '.' {
                    compound.classes.push(name.to_string());
                } else {
                    compound.id = Some(name.to_string());
                }
                rest = &body[end..];
            }
            '[' => {
                let close = rest
                    .find(']')
                    .ok_or_else(|| AppError::invalid_selector(whole, "缺少 ']'"))?;
                let inner = &rest[1..close];
                let (name, value) = match inner.split_once('=') {
                    Some((n, v)) => (n, Some(v.trim_matches(['"', '\'']).to_string())),
                    None => (inner, None),
                };
                if name.is_empty() {
                    return Err(AppError::invalid_selector(whole, "空的属性名"));
                }
                compound.attributes.push((name.to_string(), value));
                rest = &rest[close + 1..];
            }
            _ => return Err(AppError::invalid_selector(whole, "无法识别的字符")),
        }
    }

    Ok(compound)
}
