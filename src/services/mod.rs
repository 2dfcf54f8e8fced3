pub mod aggregator;
pub mod group_locator;
pub mod patcher;
pub mod pattern_extractor;
pub mod reporter;

pub use aggregator::{compute_group_average, compute_overall};
pub use group_locator::{BonusFilter, GroupFilter, GroupLocator, HeaderCandidate, LocatedGroup, NameTokenFilter};
pub use patcher::Patcher;
pub use pattern_extractor::{ItemText, PatternExtractor};
pub use reporter::Reporter;
