//! # ScoDoc Patcher
//!
//! 在 ScoDoc 成绩单页面上补全缺失的 UE 平均和总平均
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 文档树抽象与页面访问
//! - `DocumentTree` - 扫描逻辑唯一依赖的树接口
//! - `MemoryTree` - 内存中的文档树，记录所有写操作
//! - `PageBridge` - 页面快照、写操作回放、变化监听（唯一持有 JsExecutor）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `GroupLocator` - 找 UE 标题及其评估行
//! - `PatternExtractor` - 从评估文本中取成绩和系数
//! - `aggregator` - 加权平均与总平均
//! - `Patcher` - 修补 UE 标题、重绘总平均
//! - `Reporter` - 控制台表格
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次扫描"的完整流程
//! - `ScanCtx` - 上下文封装（扫描序号 + 触发原因）
//! - `ScanFlow` - 流程编排（定位 → 提取 → 计算 → 修补 → 报告）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用生命周期，持有 Browser
//! - `orchestrator/scheduler` - 防抖调度
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::{Config, ScanProfile};
pub use error::{AppError, AppResult};
pub use infrastructure::{DocumentTree, JsExecutor, MemoryTree, PageBridge};
pub use models::{GradeRecord, Group, OverallResult};
pub use orchestrator::{App, MemoryScanner, MutationScheduler};
pub use workflow::{ScanCtx, ScanFlow, ScanOutcome, ScanTrigger};
