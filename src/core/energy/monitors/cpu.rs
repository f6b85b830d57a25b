//! Processor energy monitor.
//!
//! For each target the monitor brackets one interval with a pair of time
//! snapshots and a pair of power readings. The target's share of processor
//! time scales the average package power over the interval.

use crate::core::config::CpuProfile;
use crate::core::energy::component::Component;
use crate::core::energy::monitor::{skip_level, EnergyDelta, Monitor, PollContext};
use crate::core::energy::sensors::{ProcessTimes, SensorProvider};
use crate::core::energy::target::{MonitoringTarget, Pid};
use crate::error::{EcoflocError, Result};

/// Fraction of rated TDP drawn at rated clock and voltage
pub const TDP_ACTIVITY_FACTOR: f64 = 0.7;

/// Processor time of the system and of one pid at an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSnapshot {
    pub cpu_time: u64,
    pub pid_time: u64,
}

/// Power read before and after an interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerMeasurement {
    pub start_power: f64,
    pub end_power: f64,
}

impl PowerMeasurement {
    pub fn average(&self) -> f64 {
        (self.start_power + self.end_power) / 2.0
    }
}

/// How package power is obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PowerStrategy {
    /// Sum of hardware per-core power sensors
    Direct,
    /// Capacitance model fed by per-core clock and voltage
    Derived { capacitance: f64 },
}

impl PowerStrategy {
    /// Pick the strategy once, from the provider's vendor flag
    pub fn select(sensors: &dyn SensorProvider, profile: Option<CpuProfile>) -> Result<Self> {
        if sensors.is_direct_power_available() {
            return Ok(PowerStrategy::Direct);
        }

        let profile = profile.ok_or_else(|| {
            EcoflocError::resource_acquisition(
                "no direct power sensor and no complete CPU profile (tdp, clockSpeed, voltage)",
            )
        })?;

        Ok(PowerStrategy::Derived {
            capacitance: capacitance(&profile),
        })
    }

    pub fn current_power(&self, sensors: &mut dyn SensorProvider) -> Result<f64> {
        match self {
            PowerStrategy::Direct => {
                let cores = sensors.cores_power()?;
                if cores.is_empty() {
                    return Err(EcoflocError::sensor_unavailable("no core power readings"));
                }
                Ok(cores.iter().map(|p| *p as f64).sum())
            }
            PowerStrategy::Derived { capacitance } => {
                let clocks = sensors.cores_clocks()?;
                let voltages = sensors.cores_voltages()?;
                derived_power(*capacitance, &clocks, &voltages)
            }
        }
    }
}

/// `0.7 × TDP / (clock × voltage²)`
pub fn capacitance(profile: &CpuProfile) -> f64 {
    TDP_ACTIVITY_FACTOR * profile.tdp / (profile.clock_speed * profile.voltage * profile.voltage)
}

/// `capacitance × mean(clock) × mean(voltage)²`
pub fn derived_power(capacitance: f64, clocks: &[f32], voltages: &[f32]) -> Result<f64> {
    let clock = mean(clocks)
        .ok_or_else(|| EcoflocError::sensor_unavailable("no core clock readings"))?;
    let voltage = mean(voltages)
        .ok_or_else(|| EcoflocError::sensor_unavailable("no core voltage readings"))?;
    Ok(capacitance * clock * voltage * voltage)
}

fn mean(values: &[f32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64)
}

/// Share of system processor time consumed by the pid between two snapshots
pub fn cpu_usage(start: &TimeSnapshot, end: &TimeSnapshot) -> Result<f64> {
    let pid_delta = end.pid_time.checked_sub(start.pid_time);
    let cpu_delta = end.cpu_time.checked_sub(start.cpu_time);

    match (pid_delta, cpu_delta) {
        (Some(pid_delta), Some(cpu_delta)) if cpu_delta > 0 && pid_delta <= cpu_delta => {
            Ok(pid_delta as f64 / cpu_delta as f64)
        }
        (pid_delta, cpu_delta) => Err(EcoflocError::TimingInconsistency {
            pid_delta: pid_delta.unwrap_or(0),
            cpu_delta: cpu_delta.unwrap_or(0),
        }),
    }
}

/// Joules over one interval: `power × usage × seconds`
pub fn interval_energy(avg_power: f64, usage: f64, interval_secs: f64) -> f64 {
    avg_power * usage * interval_secs
}

pub struct CpuMonitor {
    sensors: Box<dyn SensorProvider>,
    times: Box<dyn ProcessTimes>,
    strategy: PowerStrategy,
}

impl CpuMonitor {
    /// Fails when neither a direct sensor nor a usable CPU profile exists
    pub fn new(
        sensors: Box<dyn SensorProvider>,
        times: Box<dyn ProcessTimes>,
        profile: Option<CpuProfile>,
    ) -> Result<Self> {
        let strategy = PowerStrategy::select(sensors.as_ref(), profile)?;
        log::info!("Processor power strategy: {:?}", strategy);
        Ok(Self {
            sensors,
            times,
            strategy,
        })
    }

    pub fn strategy(&self) -> PowerStrategy {
        self.strategy
    }

    fn take_time_snapshot(&mut self, pid: Pid) -> Result<TimeSnapshot> {
        Ok(TimeSnapshot {
            cpu_time: self.times.system_time()?,
            pid_time: self.times.process_time(pid)?,
        })
    }

    /// Power before and after sleeping one interval.
    ///
    /// `None` when shutdown cut the interval short.
    fn measure_power_over_interval(
        &mut self,
        poll: &PollContext<'_>,
    ) -> Result<Option<PowerMeasurement>> {
        let start_power = self.strategy.current_power(self.sensors.as_mut())?;
        if !poll.sleep_interval() {
            return Ok(None);
        }
        let end_power = self.strategy.current_power(self.sensors.as_mut())?;
        Ok(Some(PowerMeasurement {
            start_power,
            end_power,
        }))
    }

    /// Energy of one target over one interval
    fn measure_target(
        &mut self,
        target: &MonitoringTarget,
        poll: &PollContext<'_>,
    ) -> Result<Option<f64>> {
        let pid = target.reference_pid();

        let start = self.take_time_snapshot(pid)?;
        let Some(power) = self.measure_power_over_interval(poll)? else {
            return Ok(None);
        };
        let end = self.take_time_snapshot(pid)?;

        let usage = cpu_usage(&start, &end)?;
        Ok(Some(interval_energy(power.average(), usage, poll.interval_secs())))
    }
}

impl Monitor for CpuMonitor {
    fn component(&self) -> Component {
        Component::Processor
    }

    fn poll_once(
        &mut self,
        snapshot: &[MonitoringTarget],
        poll: &PollContext<'_>,
    ) -> Vec<EnergyDelta> {
        let mut deltas = Vec::new();

        for target in snapshot.iter().filter(|t| t.is_enabled(Component::Processor)) {
            if poll.stopping() {
                break;
            }

            match self.measure_target(target, poll) {
                Ok(Some(joules)) => {
                    deltas.push(EnergyDelta::owner(target.pids(), Component::Processor, joules))
                }
                Ok(None) => break,
                Err(e) => log::log!(
                    skip_level(&e),
                    "CPU cycle skipped for {}: {}",
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
