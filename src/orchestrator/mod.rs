//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责资源持有和扫描调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用生命周期
//! - 初始化（扫描规则、浏览器、页面桥接）
//! - 把页面变化事件转发给调度器
//! - 离线快照模式
//!
//! ### `scheduler` - 防抖调度器
//! - `Idle` / `ScanPending` 两个状态
//! - 同一时刻最多一次扫描
//!
//! ### `scanners` - 扫描执行者
//! - `PageScanner`：真实页面（快照 → 扫描 → 回放写操作）
//! - `MemoryScanner`：内存树
//!
//! ## 层次关系
//!
//! ```text
//! app (持有 Browser)
//!     ↓
//! scheduler (决定何时扫描)
//!     ↓
//! scanners (决定在哪棵树上扫描)
//!     ↓
//! workflow::ScanFlow (一次扫描)
//!     ↓
//! services (定位 / 提取 / 计算 / 修补 / 报告)
//!     ↓
//! infrastructure (DocumentTree、PageBridge)
//! ```

pub mod app;
pub mod scanners;
pub mod scheduler;

// 重新导出主要类型
pub use app::App;
pub use scanners::{MemoryScanner, PageScanner};
pub use scheduler::{DebounceScheduler, MutationScheduler, Scanner, SchedulerState, TreeEvent};
