//! Configuration structures for the weftdns proxy:
//! - `root`: top-level configuration file
//! - `cache`: response cache settings
//! - `logging`: logging settings
//! - `errors`: configuration errors

pub mod cache;
pub mod errors;
pub mod logging;
pub mod root;

pub use cache::CacheConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::Config;
