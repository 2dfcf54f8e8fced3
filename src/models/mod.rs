pub mod grade;
pub mod snapshot;

pub use grade::{GradeRecord, Group, OverallResult};
pub use snapshot::{load_snapshot, PageSnapshot, SnapshotNode};
