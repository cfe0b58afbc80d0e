//! CLI command implementations

pub mod cache;
pub mod config;
pub mod sign;

pub use cache::execute as cache;
pub use config::execute as config;
pub use sign::execute as sign;
