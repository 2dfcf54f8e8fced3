//! 扫描执行者
//!
//! - [`PageScanner`]：真实页面。快照 → 内存树上扫描 → 把写操作回放到页面
//! - [`MemoryScanner`]：直接在内存树上扫描（离线快照、测试）

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use crate::infrastructure::{MemoryTree, PageBridge, TreeWrite};
use crate::orchestrator::scheduler::{Scanner, TreeEvent};
use crate::workflow::{ScanCtx, ScanFlow, ScanOutcome};

/// 页面扫描者，唯一持有页面桥接
pub struct PageScanner {
    bridge: PageBridge,
    flow: ScanFlow,
}

impl PageScanner {
    pub fn new(bridge: PageBridge, flow: ScanFlow) -> Self {
        Self { bridge, flow }
    }
}

impl Scanner for PageScanner {
    async fn scan(&mut self, ctx: ScanCtx) -> Result<ScanOutcome> {
        // 宿主的 shadow root 可能是后来才出现的，每次扫描前补挂观察者
        self.bridge.install_observer().await?;

        let snapshot = self.bridge.snapshot().await?;
        let mut tree = MemoryTree::from_snapshot(snapshot.host.as_ref());
        let outcome = self.flow.run(&mut tree, &ctx);

        let writes = tree.take_writes();
        if !writes.is_empty() {
            let applied = self.bridge.apply(&tree, &writes).await?;
            debug!("{} 页面端生效 {}/{} 个写操作", ctx, applied, writes.len());
        }

        Ok(outcome)
    }
}

/// 内存树扫描者
///
/// 设置了 `feedback` 时，扫描修改了 UE 节点就回送一个变化事件，
/// 模拟页面观察者看到了自己的修改（总平均节点的重绘和页面端一样被忽略）。
pub struct MemoryScanner {
    tree: MemoryTree,
    flow: ScanFlow,
    feedback: Option<mpsc::Sender<TreeEvent>>,
    outcomes: Vec<ScanOutcome>,
}

impl MemoryScanner {
    pub fn new(tree: MemoryTree, flow: ScanFlow) -> Self {
        Self {
            tree,
            flow,
            feedback: None,
            outcomes: Vec::new(),
        }
    }

    pub fn with_feedback(mut self, sender: mpsc::Sender<TreeEvent>) -> Self {
        self.feedback = Some(sender);
        self
    }

    pub fn tree(&self) -> &MemoryTree {
        &self.tree
    }

    /// 历次扫描结果
    pub fn outcomes(&self) -> &[ScanOutcome] {
        &self.outcomes
    }
}

impl Scanner for MemoryScanner {
    async fn scan(&mut self, ctx: ScanCtx) -> Result<ScanOutcome> {
        let outcome = self.flow.run(&mut self.tree, &ctx);
        let writes = self.tree.take_writes();
        let touched_groups = writes
            .iter()
            .any(|w| !matches!(w, TreeWrite::RenderById { .. }));
        if touched_groups {
            if let Some(sender) = &self.feedback {
                let _ = sender.try_send(TreeEvent);
            }
        }
        self.outcomes.push(outcome.clone());
        Ok(outcome)
    }
}
