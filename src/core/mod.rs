// Core business logic module

pub mod config;
pub mod energy;

// Re-export commonly used items
pub use config::Config;
pub use energy::{Component, MonitoringContext, TargetRegistry};
