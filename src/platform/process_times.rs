use std::time::Instant;

use sysinfo::{Pid as SysPid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::core::energy::sensors::ProcessTimes;
use crate::core::energy::target::Pid;
use crate::error::{EcoflocError, Result};

/// Processor time counters from `sysinfo`, in milliseconds.
///
/// System time is wall time multiplied by the logical core count, so a pid
/// saturating every core has a usage of one.
pub struct SysinfoProcessTimes {
    system: System,
    started: Instant,
    logical_cores: u64,
}

impl SysinfoProcessTimes {
    pub fn new() -> Self {
        let logical_cores = std::thread::available_parallelism()
            .map(|n| n.get() as u64)
            .unwrap_or(1);

        Self {
            system: System::new(),
            started: Instant::now(),
            logical_cores,
        }
    }
}

impl Default for SysinfoProcessTimes {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTimes for SysinfoProcessTimes {
    fn system_time(&mut self) -> Result<u64> {
        Ok(self.started.elapsed().as_millis() as u64 * self.logical_cores)
    }

    fn process_time(&mut self, pid: Pid) -> Result<u64> {
        let sys_pid = SysPid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu(),
        );

        self.system
            .process(sys_pid)
            .map(|process| process.accumulated_cpu_time())
            .ok_or_else(|| EcoflocError::sensor_unavailable(format!("process {} not found", pid)))
    }
}
