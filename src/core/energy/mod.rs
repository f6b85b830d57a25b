//! Concurrent per-process energy monitoring engine.

pub mod component;
pub mod context;
pub mod monitor;
pub mod monitors;
pub mod publisher;
pub mod registry;
pub mod runtime;
pub mod sensors;
pub mod shutdown;
pub mod target;

pub use component::{Component, ComponentSet, PerComponent};
pub use context::MonitoringContext;
pub use monitor::{Attribution, EnergyDelta, Monitor, MonitorDriver, PollContext, RunMode};
pub use publisher::{EnergyPublisher, MemoryPublisher, SharedEnergyRecord};
pub use registry::TargetRegistry;
pub use runtime::MonitorRuntime;
pub use shutdown::ShutdownSignal;
pub use target::{EnergyTotals, MonitoringTarget, Pid};
