//! 变化调度器 - 编排层
//!
//! 两个状态：`Idle` 和 `ScanPending`。
//! - 页面变化或启动信号：进入 `ScanPending` 并设置定时器
//! - 定时器触发前再次变化：取消并重新设置定时器（防抖）
//! - 定时器触发：执行一次完整扫描，回到 `Idle`
//!
//! 状态机本身是纯的（时钟由调用方传入），[`MutationScheduler`] 负责用 tokio 驱动它。

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error};

use crate::workflow::{ScanCtx, ScanOutcome, ScanTrigger};

/// 页面变化事件，内容无关紧要，只需要"发生过"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeEvent;

/// 调度状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    ScanPending {
        deadline: Instant,
        trigger: ScanTrigger,
    },
}

/// 防抖状态机
#[derive(Debug, Clone)]
pub struct DebounceScheduler {
    state: SchedulerState,
    debounce: Duration,
    bootstrap_delay: Duration,
}

impl DebounceScheduler {
    pub fn new(debounce: Duration, bootstrap_delay: Duration) -> Self {
        Self {
            state: SchedulerState::Idle,
            debounce,
            bootstrap_delay,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::ScanPending { deadline, .. } => Some(deadline),
            SchedulerState::Idle => None,
        }
    }

    /// 启动信号
    pub fn on_bootstrap(&mut self, now: Instant) {
        self.arm(now + self.bootstrap_delay, ScanTrigger::Bootstrap);
    }

    /// 页面变化：之前的定时器作废
    pub fn on_mutation(&mut self, now: Instant) {
        self.arm(now + self.debounce, ScanTrigger::Mutation);
    }

    fn arm(&mut self, deadline: Instant, trigger: ScanTrigger) {
        self.state = SchedulerState::ScanPending { deadline, trigger };
    }

    /// 定时器到期：回到 `Idle` 并返回应执行的扫描；未到期或空闲时返回 `None`
    pub fn fire(&mut self, now: Instant) -> Option<ScanTrigger> {
        match self.state {
            SchedulerState::ScanPending { deadline, trigger } if now >= deadline => {
                self.state = SchedulerState::Idle;
                Some(trigger)
            }
            _ => None,
        }
    }

    /// 不论是否到期，取出待执行的扫描
    pub fn take_pending(&mut self) -> Option<ScanTrigger> {
        match std::mem::replace(&mut self.state, SchedulerState::Idle) {
            SchedulerState::ScanPending { trigger, .. } => Some(trigger),
            SchedulerState::Idle => None,
        }
    }
}

/// 扫描执行者：持有文档树（或页面），执行一次完整扫描
pub trait Scanner {
    fn scan(&mut self, ctx: ScanCtx) -> impl Future<Output = Result<ScanOutcome>>;
}

/// 用 tokio 驱动防抖状态机
pub struct MutationScheduler {
    machine: DebounceScheduler,
    scans: usize,
}

impl MutationScheduler {
    pub fn new(debounce: Duration, bootstrap_delay: Duration) -> Self {
        Self {
            machine: DebounceScheduler::new(debounce, bootstrap_delay),
            scans: 0,
        }
    }

    /// 已执行的扫描次数
    pub fn scans(&self) -> usize {
        self.scans
    }

    pub fn state(&self) -> SchedulerState {
        self.machine.state()
    }

    /// 运行直到事件通道关闭；关闭时若仍有待执行的扫描，先执行它。返回累计扫描次数。
    ///
    /// 扫描在本任务内直接 await，所以同一时刻最多只有一次扫描。
    pub async fn run<S: Scanner>(
        &mut self,
        mut events: mpsc::Receiver<TreeEvent>,
        scanner: &mut S,
    ) -> usize {
        self.machine.on_bootstrap(Instant::now());

        loop {
            let deadline = self.machine.deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(TreeEvent) => {
                        self.machine.on_mutation(Instant::now());
                    }
                    None => {
                        if let Some(trigger) = self.machine.take_pending() {
                            self.run_scan(scanner, trigger).await;
                        }
                        break;
                    }
                },
                _ = wait_until(deadline) => {
                    if let Some(trigger) = self.machine.fire(Instant::now()) {
                        self.run_scan(scanner, trigger).await;
                    }
                }
            }
        }

        self.scans
    }

    async fn run_scan<S: Scanner>(&mut self, scanner: &mut S, trigger: ScanTrigger) {
        self.scans += 1;
        let ctx = ScanCtx::new(self.scans, trigger);
        match scanner.scan(ctx).await {
            Ok(outcome) => debug!(
                "{} 完成: {} 个 UE, 新修补 {}",
                ctx,
                outcome.groups.len(),
                outcome.new_patches
            ),
            Err(e) => error!("{} ❌ 扫描失败: {:#}", ctx, e),
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
