pub mod cache;
pub mod maintenance;

pub use cache::{CacheKey, CacheMetrics, EntryFlags, ResponseCache};
pub use maintenance::CacheMaintainer;
