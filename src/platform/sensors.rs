//! Host implementation of the sensor provider.
//!
//! Direct power comes from RAPL where the powercap counter is readable.
//! Otherwise clocks and voltages feed the capacitance model: WMI on Windows,
//! `sysinfo` clocks plus the rated voltage elsewhere.

use std::time::Duration;

#[cfg(not(windows))]
use sysinfo::{CpuRefreshKind, RefreshKind, System};

use super::gpu::NvidiaEnergy;
use super::rapl::RaplPackage;
use crate::core::energy::sensors::SensorProvider;
use crate::core::energy::target::Pid;
use crate::error::{EcoflocError, Result};

pub struct HostSensors {
    rapl: Option<RaplPackage>,
    gpu: Option<NvidiaEnergy>,
    /// Rated voltage used where the OS exposes no per-core voltage
    nominal_voltage: Option<f32>,
    #[cfg(not(windows))]
    system: System,
}

impl HostSensors {
    /// Processor sensors. Graphics readings stay unavailable.
    pub fn processor(nominal_voltage: Option<f64>) -> Self {
        let rapl = match RaplPackage::open() {
            Ok(rapl) => Some(rapl),
            Err(e) => {
                log::debug!("Direct power unavailable: {}", e);
                None
            }
        };

        Self {
            rapl,
            gpu: None,
            nominal_voltage: nominal_voltage.map(|v| v as f32),
            #[cfg(not(windows))]
            system: System::new_with_specifics(
                RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_frequency()),
            ),
        }
    }

    /// Graphics sensors. Fails when no NVML device can be opened.
    pub fn graphics() -> Result<Self> {
        let gpu = NvidiaEnergy::new()?;
        let mut sensors = Self::processor(None);
        sensors.rapl = None;
        sensors.gpu = Some(gpu);
        Ok(sensors)
    }

    fn nominal_voltages(&self, cores: usize) -> Result<Vec<f32>> {
        let voltage = self.nominal_voltage.ok_or_else(|| {
            EcoflocError::sensor_unavailable("no per-core voltage sensor and no rated voltage")
        })?;
        Ok(vec![voltage; cores])
    }
}

impl SensorProvider for HostSensors {
    fn is_direct_power_available(&self) -> bool {
        self.rapl.is_some()
    }

    fn cores_power(&mut self) -> Result<Vec<f32>> {
        let rapl = self
            .rapl
            .as_mut()
            .ok_or_else(|| EcoflocError::sensor_unavailable("no direct power sensor"))?;
        // RAPL reports the whole package as one reading
        Ok(vec![rapl.power()?])
    }

    #[cfg(windows)]
    fn cores_clocks(&mut self) -> Result<Vec<f32>> {
        let readings = super::system::windows::processor_clocks_and_voltages()?;
        Ok(readings
            .iter()
            .flat_map(|r| std::iter::repeat(r.clock_hz).take(r.logical_cores as usize))
            .collect())
    }

    #[cfg(not(windows))]
    fn cores_clocks(&mut self) -> Result<Vec<f32>> {
        self.system.refresh_cpu_frequency();
        Ok(self
            .system
            .cpus()
            .iter()
            .map(|cpu| cpu.frequency() as f32 * 1.0e6)
            .filter(|hz| *hz > 0.0)
            .collect())
    }

    #[cfg(windows)]
    fn cores_voltages(&mut self) -> Result<Vec<f32>> {
        let readings = super::system::windows::processor_clocks_and_voltages()?;
        let mut voltages = Vec::new();
        for reading in &readings {
            let cores = reading.logical_cores as usize;
            match reading.voltage {
                Some(v) => voltages.extend(std::iter::repeat(v).take(cores)),
                None => voltages.extend(self.nominal_voltages(cores)?),
            }
        }
        Ok(voltages)
    }

    #[cfg(not(windows))]
    fn cores_voltages(&mut self) -> Result<Vec<f32>> {
        let cores = self.system.cpus().len().max(1);
        self.nominal_voltages(cores)
    }

    fn gpu_joules(&mut self, pids: &[Pid], interval_ms: u64) -> Result<i32> {
        let gpu = self
            .gpu
            .as_ref()
            .ok_or_else(|| EcoflocError::sensor_unavailable("no graphics energy source"))?;
        let joules = gpu.joules_for(pids, Duration::from_millis(interval_ms))?;
        Ok(joules.round() as i32)
    }
}
