// Platform-specific code module

pub mod disk_counters;
pub mod gpu;
pub mod process_times;
pub mod processes;
pub mod rapl;
pub mod sensors;
pub mod shared_memory;
pub mod system;

use std::sync::Arc;

use crate::core::config::Config;
use crate::core::energy::monitors::{CpuMonitor, GpuMonitor, NetworkMonitor, StorageMonitor};
use crate::core::energy::publisher::{EnergyPublisher, MemoryPublisher};
use crate::core::energy::sensors::TcpStatsProvider;
use crate::core::energy::{Component, Monitor};
use crate::error::{EcoflocError, Result};

// Re-exports for shorter import paths
pub use disk_counters::SysinfoDiskCounters;
pub use process_times::SysinfoProcessTimes;
pub use processes::{ProcessLookup, SysinfoProcessLookup};
pub use sensors::HostSensors;
pub use shared_memory::SharedMemoryPublisher;

/// Monitors that could be built on this host, plus the ones that could not
pub struct HostMonitors {
    pub monitors: Vec<Box<dyn Monitor>>,
    pub unavailable: Vec<(Component, EcoflocError)>,
}

/// Build every monitor this host supports.
///
/// A component whose resources cannot be acquired is reported in
/// `unavailable` and does not run.
pub fn host_monitors(config: &Config) -> HostMonitors {
    let mut monitors: Vec<Box<dyn Monitor>> = Vec::new();
    let mut unavailable = Vec::new();

    let cpu = CpuMonitor::new(
        Box::new(HostSensors::processor(config.cpu.map(|p| p.voltage))),
        Box::new(SysinfoProcessTimes::new()),
        config.usable_cpu_profile(),
    );
    match cpu {
        Ok(monitor) => monitors.push(Box::new(monitor)),
        Err(e) => unavailable.push((Component::Processor, e)),
    }

    match HostSensors::graphics() {
        Ok(sensors) => monitors.push(Box::new(GpuMonitor::new(Box::new(sensors)))),
        Err(e) => unavailable.push((Component::Graphics, e)),
    }

    monitors.push(Box::new(
        StorageMonitor::new(Box::new(SysinfoDiskCounters::new()))
            .with_eviction(config.storage.evict_stale_counters),
    ));

    match host_tcp_stats() {
        Ok(tcp) => monitors.push(Box::new(NetworkMonitor::new(tcp))),
        Err(e) => unavailable.push((Component::Network, e)),
    }

    HostMonitors {
        monitors,
        unavailable,
    }
}

#[cfg(windows)]
pub fn host_tcp_stats() -> Result<Box<dyn TcpStatsProvider>> {
    Ok(Box::new(system::windows::IpHelperTcpStats::new()?))
}

#[cfg(not(windows))]
pub fn host_tcp_stats() -> Result<Box<dyn TcpStatsProvider>> {
    Err(EcoflocError::resource_acquisition(
        "per-connection TCP statistics are only available on Windows",
    ))
}

/// Shared segment publisher, or an in-memory one when disabled or when the
/// segment cannot be created
pub fn host_publisher(config: &Config) -> Arc<dyn EnergyPublisher> {
    if !config.shared_memory.enabled {
        return Arc::new(MemoryPublisher::new());
    }

    match SharedMemoryPublisher::create(&config.shared_memory.name) {
        Ok(publisher) => Arc::new(publisher),
        Err(e) => {
            log::warn!("Shared memory disabled: {}", e);
            Arc::new(MemoryPublisher::new())
        }
    }
}
