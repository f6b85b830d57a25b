//! Shared target registry.
//!
//! All mutations go through one lock and every critical section is a copy
//! or a scan. Sensor queries and sleeps happen against snapshots, outside
//! the lock.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::component::Component;
use super::monitor::{Attribution, EnergyDelta};
use super::publisher::{EnergyPublisher, SharedEnergyRecord};
use super::target::{EnergyTotals, MonitoringTarget, Pid};
use crate::error::{EcoflocError, Result};

pub struct TargetRegistry {
    targets: Mutex<Vec<MonitoringTarget>>,
    dirty: [AtomicBool; 4],
    publisher: Arc<dyn EnergyPublisher>,
}

impl TargetRegistry {
    /// Empty registry. Every dirty flag starts set so that a monitor's first
    /// cycle takes a snapshot.
    pub fn new(publisher: Arc<dyn EnergyPublisher>) -> Self {
        Self {
            targets: Mutex::new(Vec::new()),
            dirty: std::array::from_fn(|_| AtomicBool::new(true)),
            publisher,
        }
    }

    pub fn len(&self) -> usize {
        self.targets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.lock().is_empty()
    }

    pub fn is_tracked(&self, pid: Pid) -> bool {
        self.targets.lock().iter().any(|t| t.owns_pid(pid))
    }

    /// Append a target. Rejected when any pid is already monitored.
    pub fn add_target(&self, name: &str, pids: Vec<Pid>, component: Component) -> Result<usize> {
        let target = MonitoringTarget::new(name, pids, component)?;

        let mut targets = self.targets.lock();
        if let Some(pid) = target
            .pids()
            .iter()
            .copied()
            .find(|pid| targets.iter().any(|t| t.owns_pid(*pid)))
        {
            return Err(EcoflocError::DuplicateTarget(pid));
        }

        targets.push(target);
        self.mark_dirty(component);
        Ok(targets.len() - 1)
    }

    /// Append a target built from the pids that are not monitored yet.
    ///
    /// Used when a process name resolves to several pids, some of which may
    /// already belong to another target.
    pub fn add_untracked(
        &self,
        name: &str,
        pids: Vec<Pid>,
        component: Component,
    ) -> Result<usize> {
        let mut targets = self.targets.lock();
        let first = pids.first().copied();
        let fresh: Vec<Pid> = pids
            .into_iter()
            .filter(|pid| !targets.iter().any(|t| t.owns_pid(*pid)))
            .collect();

        if fresh.is_empty() {
            return match first {
                Some(pid) => Err(EcoflocError::DuplicateTarget(pid)),
                None => Err(EcoflocError::invalid_target(format!(
                    "'{}' has no process identifiers",
                    name
                ))),
            };
        }

        targets.push(MonitoringTarget::new(name, fresh, component)?);
        self.mark_dirty(component);
        Ok(targets.len() - 1)
    }

    /// Erase the target at `index` and flag every component for refresh
    pub fn remove_target(&self, index: usize) -> Result<MonitoringTarget> {
        let mut targets = self.targets.lock();
        check_index(index, targets.len())?;

        let removed = targets.remove(index);
        for component in Component::ALL {
            self.mark_dirty(component);
        }
        Ok(removed)
    }

    pub fn enable_component(&self, index: usize, component: Component) -> Result<()> {
        self.set_component(index, component, true)
    }

    pub fn disable_component(&self, index: usize, component: Component) -> Result<()> {
        self.set_component(index, component, false)
    }

    fn set_component(&self, index: usize, component: Component, enabled: bool) -> Result<()> {
        let mut targets = self.targets.lock();
        check_index(index, targets.len())?;

        targets[index].set_enabled(component, enabled);
        self.mark_dirty(component);
        Ok(())
    }

    /// Independent copy of every target
    pub fn snapshot(&self) -> Vec<MonitoringTarget> {
        self.targets.lock().clone()
    }

    /// Replace `local` with a fresh snapshot if `component` is dirty.
    ///
    /// Returns `true` when the view was refreshed.
    pub fn refresh_if_dirty(&self, component: Component, local: &mut Vec<MonitoringTarget>) -> bool {
        if !self.dirty[component.index()].swap(false, Ordering::AcqRel) {
            return false;
        }
        *local = self.snapshot();
        true
    }

    pub fn is_dirty(&self, component: Component) -> bool {
        self.dirty[component.index()].load(Ordering::Acquire)
    }

    fn mark_dirty(&self, component: Component) {
        self.dirty[component.index()].store(true, Ordering::Release);
    }

    /// Add `joules` to the target whose reference pid matches `pids[0]`.
    ///
    /// Resolution is by pid, never by index, so a delta computed against an
    /// old snapshot lands on the right target or nowhere.
    pub fn apply_energy_delta(&self, pids: &[Pid], component: Component, joules: f64) -> bool {
        let Some(reference) = pids.first().copied() else {
            return false;
        };
        self.apply_where(component, joules, |t| t.reference_pid() == reference)
    }

    /// Add `joules` to the first target that has any pids.
    ///
    /// This is the attribution rule used for storage and network energy. It
    /// does not follow the process that generated the I/O.
    pub fn apply_to_first_tracked(&self, component: Component, joules: f64) -> bool {
        self.apply_where(component, joules, |t| !t.pids().is_empty())
    }

    /// Commit a delta produced by a monitor
    pub fn commit(&self, delta: &EnergyDelta) -> bool {
        match &delta.attribution {
            Attribution::Owner(pids) => {
                self.apply_energy_delta(pids, delta.component, delta.joules)
            }
            Attribution::FirstTracked => {
                self.apply_to_first_tracked(delta.component, delta.joules)
            }
        }
    }

    fn apply_where<F>(&self, component: Component, joules: f64, predicate: F) -> bool
    where
        F: Fn(&MonitoringTarget) -> bool,
    {
        if !joules.is_finite() || joules < 0.0 {
            log::warn!("Rejected {} energy delta of {} J", component, joules);
            return false;
        }

        let mut targets = self.targets.lock();
        let Some(target) = targets.iter_mut().find(|t| predicate(t)) else {
            log::debug!("No target left for {} delta of {:.6} J", component, joules);
            return false;
        };

        target.add_energy(component, joules);

        let totals = EnergyTotals::from_targets(targets.iter());
        self.publisher.publish(&SharedEnergyRecord::now(&totals));
        true
    }

    /// Per-component sums across every target
    pub fn totals(&self) -> EnergyTotals {
        EnergyTotals::from_targets(self.targets.lock().iter())
    }
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(EcoflocError::InvalidIndex {
            index: index as i64,
            len,
        });
    }
    Ok(())
}
