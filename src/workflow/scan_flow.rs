//! 扫描流程 - 流程层
//!
//! 核心职责：定义"一次扫描"的完整流程
//!
//! 流程顺序：
//! 1. 定位 UE 标题和评估行
//! 2. 提取成绩/系数，计算 UE 加权平均
//! 3. 修补未标记的 UE 标题
//! 4. 计算并重绘总平均（找到了 UE 但都没有平均时显示 `-`）
//! 5. 有新修补时输出报告
//!
//! 整个流程同步执行，开始后一定跑完，不会和另一次扫描交错。

use tracing::{debug, info};

use crate::config::ScanProfile;
use crate::error::AppResult;
use crate::infrastructure::DocumentTree;
use crate::models::{Group, OverallResult};
use crate::services::{
    compute_group_average, compute_overall, GroupLocator, Patcher, PatternExtractor, Reporter,
};
use crate::workflow::scan_ctx::ScanCtx;

/// 一次扫描的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub groups: Vec<Group>,
    pub overall: Option<OverallResult>,
    /// 本次新修补的 UE 数量
    pub new_patches: usize,
}

/// 扫描流程
///
/// - 不持有文档树，每次扫描由调用方传入
/// - 只依赖业务能力（services）
pub struct ScanFlow {
    locator: GroupLocator,
    extractor: PatternExtractor,
    patcher: Patcher,
    reporter: Reporter,
}

impl ScanFlow {
    pub fn new(profile: &ScanProfile) -> AppResult<Self> {
        Ok(Self {
            locator: GroupLocator::from_profile(profile)?,
            extractor: PatternExtractor::from_profile(profile)?,
            patcher: Patcher::from_profile(profile),
            reporter: Reporter::new(),
        })
    }

    /// 替换报告输出方式
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// 只读地收集所有 UE 及其平均
    pub fn collect_groups<T: DocumentTree + ?Sized>(&self, tree: &T) -> Vec<Group> {
        self.locator
            .locate(tree)
            .into_iter()
            .map(|located| {
                let records: Vec<_> = located
                    .items
                    .iter()
                    .map(|&item| {
                        let text = self.locator.item_text(tree, item);
                        self.extractor.extract_item(&text)
                    })
                    .collect();
                let average = compute_group_average(&records);
                debug!(
                    "UE '{}': {} 条评估, 平均 {:?}",
                    located.identifier,
                    records.len(),
                    average
                );
                Group {
                    identifier: located.identifier,
                    header: located.header,
                    records,
                    average,
                }
            })
            .collect()
    }

    pub fn run<T: DocumentTree + ?Sized>(&self, tree: &mut T, ctx: &ScanCtx) -> ScanOutcome {
        let groups = self.collect_groups(tree);
        if groups.is_empty() {
            debug!("{} 未找到 UE，跳过", ctx);
            return ScanOutcome {
                groups,
                overall: None,
                new_patches: 0,
            };
        }

        let mut new_patches = 0;
        for group in &groups {
            if self
                .patcher
                .patch_group_display(tree, group.header, group.average)
            {
                new_patches += 1;
                debug!("{} ✓ 已写入 '{}'", ctx, group.identifier);
            }
        }

        let averages: Vec<Option<f64>> = groups.iter().map(|g| g.average).collect();
        let overall = compute_overall(&averages);
        self.patcher.render_overall_summary(tree, overall.as_ref());

        if new_patches > 0 {
            info!("{} 找到 {} 个 UE，新修补 {} 个", ctx, groups.len(), new_patches);
        }
        self.reporter.emit(&groups, overall.as_ref(), new_patches);

        ScanOutcome {
            groups,
            overall,
            new_patches,
        }
    }
}
