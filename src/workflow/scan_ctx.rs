//! 扫描上下文
//!
//! 封装"这是第几次扫描、由什么触发"这一信息，仅用于日志

use std::fmt::Display;

/// 扫描触发原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTrigger {
    /// 启动后的首次扫描
    Bootstrap,
    /// 页面变化后的防抖扫描
    Mutation,
    /// 离线快照
    Snapshot,
}

/// 扫描上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCtx {
    /// 扫描序号（从1开始）
    pub scan_index: usize,
    pub trigger: ScanTrigger,
}

impl ScanCtx {
    pub fn new(scan_index: usize, trigger: ScanTrigger) -> Self {
        Self {
            scan_index,
            trigger,
        }
    }
}

impl Display for ScanCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let trigger = match self.trigger {
            ScanTrigger::Bootstrap => "启动",
            ScanTrigger::Mutation => "页面变化",
            ScanTrigger::Snapshot => "快照",
        };
        write!(f, "[扫描 #{} 触发:{}]", self.scan_index, trigger)
    }
}
