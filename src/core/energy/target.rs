use serde::{Deserialize, Serialize};

use super::component::{Component, ComponentSet, PerComponent};
use crate::error::{EcoflocError, Result};

/// Operating-system process identifier
pub type Pid = u32;

/// A named group of processes accounted as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TargetFields")]
pub struct MonitoringTarget {
    name: String,
    pids: Vec<Pid>,
    enabled: ComponentSet,
    energy: PerComponent<f64>,
}

impl MonitoringTarget {
    /// Build a target with `component` enabled. Rejects an empty pid list.
    pub fn new(name: impl Into<String>, pids: Vec<Pid>, component: Component) -> Result<Self> {
        let name = name.into();
        if pids.is_empty() {
            return Err(EcoflocError::invalid_target(format!(
                "'{}' has no process identifiers",
                name
            )));
        }

        Ok(Self {
            name,
            pids,
            enabled: ComponentSet::only(component),
            energy: PerComponent::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    /// First pid, used as the timing reference for processor accounting
    pub fn reference_pid(&self) -> Pid {
        self.pids[0]
    }

    pub fn owns_pid(&self, pid: Pid) -> bool {
        self.pids.contains(&pid)
    }

    pub fn is_enabled(&self, component: Component) -> bool {
        self.enabled.contains(component)
    }

    pub fn enabled(&self) -> ComponentSet {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, component: Component, enabled: bool) {
        if enabled {
            self.enabled.insert(component);
        } else {
            self.enabled.remove(component);
        }
    }

    /// Cumulative joules for a component
    pub fn energy(&self, component: Component) -> f64 {
        self.energy.get(component)
    }

    pub(crate) fn add_energy(&mut self, component: Component, joules: f64) {
        *self.energy.get_mut(component) += joules;
    }
}

/// Unchecked wire form; goes through the same pid check as `new`
#[derive(Deserialize)]
struct TargetFields {
    name: String,
    pids: Vec<Pid>,
    enabled: ComponentSet,
    energy: PerComponent<f64>,
}

impl TryFrom<TargetFields> for MonitoringTarget {
    type Error = EcoflocError;

    fn try_from(fields: TargetFields) -> Result<Self> {
        if fields.pids.is_empty() {
            return Err(EcoflocError::invalid_target(format!(
                "'{}' has no process identifiers",
                fields.name
            )));
        }
        Ok(Self {
            name: fields.name,
            pids: fields.pids,
            enabled: fields.enabled,
            energy: fields.energy,
        })
    }
}

/// Sum of cumulative energy across every target
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyTotals {
    pub cpu: f64,
    pub gpu: f64,
    pub sd: f64,
    pub nic: f64,
}

impl EnergyTotals {
    pub fn from_targets<'a>(targets: impl IntoIterator<Item = &'a MonitoringTarget>) -> Self {
        targets.into_iter().fold(Self::default(), |mut acc, t| {
            acc.cpu += t.energy(Component::Processor);
            acc.gpu += t.energy(Component::Graphics);
            acc.sd += t.energy(Component::Storage);
            acc.nic += t.energy(Component::Network);
            acc
        })
    }

    pub fn total(&self) -> f64 {
        self.cpu + self.gpu + self.sd + self.nic
    }
}
