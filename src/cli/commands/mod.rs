//! CLI command implementations

pub mod config;
pub mod get;
pub mod snapshot;
pub mod watch;

pub use config::execute as config;
pub use get::execute as get;
pub use snapshot::execute as snapshot;
pub use watch::execute as watch;
