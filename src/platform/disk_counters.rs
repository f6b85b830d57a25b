//! Per-process disk byte rates from `sysinfo`.
//!
//! Counter instances are named `<process name>#<pid>`. `sysinfo` reports
//! disk usage as bytes since the previous disk refresh of that process, so
//! registering takes a baseline and each handle keeps its own sample time.

use std::collections::HashMap;
use std::time::Instant;

use sysinfo::{Pid as SysPid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::core::energy::sensors::{CounterHandle, CounterProvider, IoRates};
use crate::core::energy::target::Pid;
use crate::error::{EcoflocError, Result};

pub struct SysinfoDiskCounters {
    system: System,
    /// Time of the last disk refresh per registered pid
    sampled_at: HashMap<Pid, Instant>,
}

impl SysinfoDiskCounters {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            sampled_at: HashMap::new(),
        }
    }

    fn refresh_disk_usage(&mut self, pids: &[SysPid]) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(pids),
            true,
            ProcessRefreshKind::nothing().with_disk_usage(),
        );
    }
}

impl Default for SysinfoDiskCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Pid encoded in an instance name
pub fn instance_pid(instance: &str) -> Option<Pid> {
    instance.rsplit_once('#')?.1.parse().ok()
}

impl CounterProvider for SysinfoDiskCounters {
    fn resolve_instance_for_pid(&mut self, pid: Pid) -> Result<Option<String>> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );

        Ok(self
            .system
            .processes()
            .iter()
            .find(|(p, _)| p.as_u32() == pid)
            .map(|(_, process)| format!("{}#{}", process.name().to_string_lossy(), pid)))
    }

    fn register_counters(&mut self, instance: &str) -> Result<CounterHandle> {
        let pid = instance_pid(instance).ok_or_else(|| {
            EcoflocError::resource_acquisition(format!("malformed counter instance '{}'", instance))
        })?;

        // Baseline: the next collect only sees bytes moved after this point
        self.refresh_disk_usage(&[SysPid::from_u32(pid)]);
        self.sampled_at.insert(pid, Instant::now());

        Ok(CounterHandle {
            instance: instance.to_string(),
            pid,
        })
    }

    fn collect(&mut self, handles: &[CounterHandle]) -> Result<Vec<Result<IoRates>>> {
        let pids: Vec<SysPid> = handles.iter().map(|h| SysPid::from_u32(h.pid)).collect();
        self.refresh_disk_usage(&pids);
        let now = Instant::now();

        Ok(handles
            .iter()
            .map(|handle| {
                let previous = self.sampled_at.insert(handle.pid, now).ok_or_else(|| {
                    EcoflocError::sensor_unavailable(format!(
                        "{} has no baseline sample",
                        handle.instance
                    ))
                })?;
                let secs = now.duration_since(previous).as_secs_f64();
                if secs <= 0.0 {
                    return Err(EcoflocError::sensor_unavailable(format!(
                        "{} sampled twice in the same instant",
                        handle.instance
                    )));
                }

                let process = self
                    .system
                    .process(SysPid::from_u32(handle.pid))
                    .ok_or_else(|| {
                        EcoflocError::sensor_unavailable(format!("{} has exited", handle.instance))
                    })?;
                let usage = process.disk_usage();
                Ok(IoRates {
                    read_bytes_per_sec: usage.read_bytes as f64 / secs,
                    write_bytes_per_sec: usage.written_bytes as f64 / secs,
                })
            })
            .collect())
    }
}
