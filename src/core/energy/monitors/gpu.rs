use crate::core::energy::component::Component;
use crate::core::energy::monitor::{skip_level, EnergyDelta, Monitor, PollContext};
use crate::core::energy::sensors::SensorProvider;
use crate::core::energy::target::MonitoringTarget;
use crate::error::{EcoflocError, Result};

/// Graphics energy monitor.
///
/// The provider integrates over the interval itself, so the reading is
/// committed as-is.
pub struct GpuMonitor {
    sensors: Box<dyn SensorProvider>,
}

impl GpuMonitor {
    pub fn new(sensors: Box<dyn SensorProvider>) -> Self {
        Self { sensors }
    }

    fn measure_target(&mut self, target: &MonitoringTarget, interval_ms: u64) -> Result<f64> {
        let joules = self.sensors.gpu_joules(target.pids(), interval_ms)?;
        if joules < 0 {
            return Err(EcoflocError::sensor_unavailable(format!(
                "negative graphics reading {}",
                joules
            )));
        }
        Ok(joules as f64)
    }
}

impl Monitor for GpuMonitor {
    fn component(&self) -> Component {
        Component::Graphics
    }

    fn poll_once(
        &mut self,
        snapshot: &[MonitoringTarget],
        poll: &PollContext<'_>,
    ) -> Vec<EnergyDelta> {
        let mut deltas = Vec::new();
        let interval_ms = poll.interval_ms();

        for target in snapshot
            .iter()
            .filter(|t| t.is_enabled(Component::Graphics) && !t.pids().is_empty())
        {
            if poll.stopping() {
                break;
            }

            match self.measure_target(target, interval_ms) {
                Ok(joules) => {
                    deltas.push(EnergyDelta::owner(target.pids(), Component::Graphics, joules))
                }
                Err(e) => log::log!(
                    skip_level(&e),
                    "GPU cycle skipped for {}: {}",
                    target.name(),
                    e,
                ),
            }
        }

        deltas
    }

    fn self_paced(&self) -> bool {
        true
    }
}
