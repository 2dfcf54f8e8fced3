pub mod js_executor;
pub mod memory_tree;
pub mod page_bridge;
pub mod selector;
pub mod tree;

pub use js_executor::JsExecutor;
pub use memory_tree::{MemoryTree, PathStep};
pub use page_bridge::PageBridge;
pub use selector::Selector;
pub use tree::{DocumentTree, Inline, NodeId, TreeWrite};
