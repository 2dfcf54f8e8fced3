//! 页面修补服务 - 业务能力层
//!
//! 每个 UE 标题只写一次：写入后打上标记属性，之后的扫描看到标记就跳过。
//! 总平均显示节点则每次扫描都整体重写。

use tracing::debug;

use crate::config::ScanProfile;
use crate::infrastructure::{DocumentTree, Inline, NodeId};
use crate::models::OverallResult;

/// 及格线（固定规则，不可配置）
pub const PASS_THRESHOLD: f64 = 10.0;
pub const PASS_CLASS: &str = "scodoc-patcher-pass";
pub const FAIL_CLASS: &str = "scodoc-patcher-fail";

/// 保留两位小数
pub fn format_average(average: f64) -> String {
    format!("{:.2}", average)
}

/// 及格/不及格样式
pub fn verdict_class(average: f64) -> &'static str {
    if average >= PASS_THRESHOLD {
        PASS_CLASS
    } else {
        FAIL_CLASS
    }
}

/// 修补器
pub struct Patcher {
    placeholder: String,
    marker_attribute: String,
    summary_id: String,
}

impl Patcher {
    pub fn from_profile(profile: &ScanProfile) -> Self {
        Self {
            placeholder: profile.placeholder.clone(),
            marker_attribute: profile.marker_attribute.clone(),
            summary_id: profile.summary_id.clone(),
        }
    }

    pub fn is_patched<T: DocumentTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        tree.attribute(node, &self.marker_attribute).is_some()
    }

    /// 把节点中的占位符替换为 UE 平均并打标记
    ///
    /// 平均为空、节点已有标记、或节点里找不到占位符时什么都不做。返回是否写入。
    pub fn patch_group_display<T: DocumentTree + ?Sized>(
        &self,
        tree: &mut T,
        node: NodeId,
        average: Option<f64>,
    ) -> bool {
        let Some(average) = average else {
            return false;
        };
        if self.is_patched(tree, node) {
            debug!("节点 {:?} 已修补，跳过", node);
            return false;
        }

        let replacement = Inline::styled(verdict_class(average), format_average(average));
        if !tree.replace_token(node, &self.placeholder, replacement) {
            debug!("节点 {:?} 中没有占位符 '{}'", node, self.placeholder);
            return false;
        }
        tree.set_attribute(node, &self.marker_attribute, "true");
        true
    }

    /// 创建（仅首次）并覆盖总平均显示节点
    ///
    /// 没有可计入的 UE 时显示 `-`，不能留着上一次的数值。
    pub fn render_overall_summary<T: DocumentTree + ?Sized>(
        &self,
        tree: &mut T,
        result: Option<&OverallResult>,
    ) -> NodeId {
        let (value, counted) = match result {
            Some(result) => (
                Inline::styled(verdict_class(result.average), format_average(result.average)),
                result.counted_groups,
            ),
            None => (Inline::text("-"), 0),
        };
        let content = [
            Inline::text("Moyenne générale : "),
            value,
            Inline::text(format!(" ({} UE)", counted)),
        ];
        tree.render_by_id(&self.summary_id, "div", &content)
    }
}
