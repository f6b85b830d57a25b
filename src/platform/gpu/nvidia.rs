#[cfg(feature = "nvml")]
use nvml_wrapper::{error::NvmlError, Device, Nvml};
use std::thread;
use std::time::Duration;

use crate::error::{EcoflocError, Result};

/// NVIDIA board energy through NVML
pub struct NvidiaEnergy {
    #[cfg(feature = "nvml")]
    nvml: Nvml,
    device_index: u32,
}

impl NvidiaEnergy {
    /// Initialize NVML and select the first GPU
    pub fn new() -> Result<Self> {
        Self::with_device_index(0)
    }

    pub fn with_device_index(index: u32) -> Result<Self> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Nvml::init().map_err(|e| {
                EcoflocError::resource_acquisition(format!("Failed to init NVML: {}", e))
            })?;

            let device = nvml.device_by_index(index).map_err(|e| {
                EcoflocError::resource_acquisition(format!("GPU {} not found: {}", index, e))
            })?;
            device.total_energy_consumption().map_err(|e| {
                EcoflocError::resource_acquisition(format!(
                    "GPU {} has no energy counter: {}",
                    index, e
                ))
            })?;

            Ok(Self {
                nvml,
                device_index: index,
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = index;
            Err(EcoflocError::resource_acquisition(
                "NVIDIA GPU support not enabled",
            ))
        }
    }

    #[cfg(feature = "nvml")]
    fn get_device(&self) -> Result<Device<'_>> {
        self.nvml
            .device_by_index(self.device_index)
            .map_err(|e| EcoflocError::sensor_unavailable(format!("Failed to get GPU device: {}", e)))
    }

    /// Board energy over `interval` scaled by the pids' share of SM activity.
    ///
    /// Sleeps for the interval between the two counter reads.
    pub fn joules_for(&self, pids: &[u32], interval: Duration) -> Result<f64> {
        #[cfg(feature = "nvml")]
        {
            let device = self.get_device()?;
            let energy_err = |e: NvmlError| {
                EcoflocError::sensor_unavailable(format!("GPU energy counter: {}", e))
            };

            let since = chrono::Utc::now().timestamp_micros().max(0) as u64;
            let start_mj = device.total_energy_consumption().map_err(energy_err)?;
            thread::sleep(interval);
            let end_mj = device.total_energy_consumption().map_err(energy_err)?;

            let samples: Vec<(u32, u32)> = device
                .process_utilization_stats(since)
                .map(|stats| stats.into_iter().map(|s| (s.pid, s.sm_util)).collect())
                .unwrap_or_default();

            let board_joules = end_mj.saturating_sub(start_mj) as f64 / 1000.0;
            Ok(board_joules * super::pid_share(&samples, pids))
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = pids;
            thread::sleep(interval);
            Err(EcoflocError::sensor_unavailable(
                "NVIDIA GPU support not enabled",
            ))
        }
    }
}
