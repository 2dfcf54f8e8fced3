//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：读取扫描规则、连接（或启动）浏览器、创建页面桥接
//! 2. **事件转发**：页面 binding 回调 → 调度器事件通道
//! 3. **调度运行**：防抖调度器驱动扫描，直到页面关闭或 Ctrl+C
//! 4. **离线模式**：设置了快照文件时只对快照做一次扫描
//!
//! 唯一持有 Browser 的模块。

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::browser;
use crate::config::{Config, ScanProfile};
use crate::infrastructure::{JsExecutor, MemoryTree, PageBridge};
use crate::models::load_snapshot;
use crate::orchestrator::scanners::{MemoryScanner, PageScanner};
use crate::orchestrator::scheduler::{MutationScheduler, Scanner, TreeEvent};
use crate::services::Reporter;
use crate::utils::logging::{log_shutdown, log_startup};
use crate::workflow::{ScanCtx, ScanFlow, ScanTrigger};

/// 事件通道容量；满了就丢弃，反正一个事件就足以触发扫描
const EVENT_BUFFER: usize = 64;

enum Mode {
    Live {
        _browser: Browser,
        bridge: PageBridge,
    },
    Offline {
        snapshot_path: PathBuf,
    },
}

/// 应用主结构
pub struct App {
    config: Config,
    profile: ScanProfile,
    mode: Mode,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let profile = config.load_profile().context("加载扫描规则失败")?;

        if let Some(path) = &config.snapshot_path {
            info!("📁 离线模式，快照文件: {}", path);
            return Ok(Self {
                mode: Mode::Offline {
                    snapshot_path: PathBuf::from(path),
                },
                config,
                profile,
            });
        }

        let (browser, page) = if config.headless {
            browser::launch_headless_browser(
                &config.target_url,
                config.chrome_executable.as_deref(),
            )
            .await?
        } else {
            browser::connect_to_browser_and_page(
                config.browser_debug_port,
                Some(&config.target_url),
                Some(&config.target_title),
            )
            .await?
        };

        // 创建 JsExecutor（持有 page）
        let bridge = PageBridge::new(JsExecutor::new(page), &profile);

        Ok(Self {
            mode: Mode::Live {
                _browser: browser,
                bridge,
            },
            config,
            profile,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(self) -> Result<()> {
        let flow = ScanFlow::new(&self.profile).context("扫描规则无效")?;
        match self.mode {
            Mode::Offline { snapshot_path } => {
                run_offline(&snapshot_path, flow.with_reporter(Reporter::always())).await
            }
            Mode::Live { _browser, bridge } => {
                let debounce = Duration::from_millis(self.config.debounce_ms);
                let bootstrap = Duration::from_millis(self.config.bootstrap_delay_ms);
                run_live(bridge, flow, debounce, bootstrap).await
            }
        }
    }
}

async fn run_live(
    bridge: PageBridge,
    flow: ScanFlow,
    debounce: Duration,
    bootstrap: Duration,
) -> Result<()> {
    let events = bridge.mutation_events().await.context("注册页面回调失败")?;
    bridge.persist_observer().await.context("注册页面初始化脚本失败")?;
    if bridge.install_observer().await? {
        info!("👀 已开始监听页面变化");
    }

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let forward = async move {
        let mut events = Box::pin(events);
        while events.next().await.is_some() {
            let _ = tx.try_send(TreeEvent);
        }
        warn!("页面事件流已结束");
    };

    let mut scanner = PageScanner::new(bridge, flow);
    let mut scheduler = MutationScheduler::new(debounce, bootstrap);

    tokio::select! {
        _ = async { tokio::join!(forward, scheduler.run(rx, &mut scanner)) } => {}
        _ = tokio::signal::ctrl_c() => info!("收到 Ctrl+C，退出"),
    }

    log_shutdown(scheduler.scans());
    Ok(())
}

async fn run_offline(snapshot_path: &std::path::Path, flow: ScanFlow) -> Result<()> {
    let snapshot = load_snapshot(snapshot_path).await?;
    if snapshot.host.is_none() {
        warn!("⚠️ 快照中没有宿主元素，无事可做");
    }

    let tree = MemoryTree::from_snapshot(snapshot.host.as_ref());
    let mut scanner = MemoryScanner::new(tree, flow);
    let outcome = scanner.scan(ScanCtx::new(1, ScanTrigger::Snapshot)).await?;

    if outcome.groups.is_empty() {
        info!("快照中没有找到 UE");
    }

    log_shutdown(1);
    Ok(())
}
