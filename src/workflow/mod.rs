pub mod scan_ctx;
pub mod scan_flow;

pub use scan_ctx::{ScanCtx, ScanTrigger};
pub use scan_flow::{ScanFlow, ScanOutcome};
