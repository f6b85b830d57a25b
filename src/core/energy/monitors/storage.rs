//! Storage energy monitor.
//!
//! Byte-rate counters are registered per counter instance and kept in a
//! cache keyed by instance name. Every cycle collects the whole cache in one
//! pass.

use std::collections::HashMap;

use crate::core::energy::component::Component;
use crate::core::energy::monitor::{skip_level, EnergyDelta, Monitor, PollContext};
use crate::core::energy::sensors::{CounterHandle, CounterProvider, IoRates};
use crate::core::energy::target::MonitoringTarget;
use crate::error::Result;

/// Watts per byte/s read
pub const READ_FACTOR: f64 = 2.2 / 5.6e9;
/// Watts per byte/s written
pub const WRITE_FACTOR: f64 = 2.2 / 5.3e9;

/// `(READ_FACTOR × read + WRITE_FACTOR × write) × seconds`
pub fn storage_energy(rates: &IoRates, interval_secs: f64) -> f64 {
    (READ_FACTOR * rates.read_bytes_per_sec + WRITE_FACTOR * rates.write_bytes_per_sec)
        * interval_secs
}

pub struct StorageMonitor {
    counters: Box<dyn CounterProvider>,
    cache: HashMap<String, CounterHandle>,
    evict_stale: bool,
}

impl StorageMonitor {
    pub fn new(counters: Box<dyn CounterProvider>) -> Self {
        Self {
            counters,
            cache: HashMap::new(),
            evict_stale: false,
        }
    }

    /// Drop cached counters whose pid left the monitored set on refresh
    pub fn with_eviction(mut self, evict_stale: bool) -> Self {
        self.evict_stale = evict_stale;
        self
    }

    pub fn cached_instances(&self) -> usize {
        self.cache.len()
    }

    /// Resolve the target's instance and register counters if new
    fn ensure_registered(&mut self, target: &MonitoringTarget) -> Result<()> {
        let pid = target.reference_pid();
        let Some(instance) = self.counters.resolve_instance_for_pid(pid)? else {
            log::debug!("No counter instance for pid {}", pid);
            return Ok(());
        };

        if !self.cache.contains_key(&instance) {
            let handle = self.counters.register_counters(&instance)?;
            log::debug!("Registered disk counters for {}", instance);
            self.cache.insert(instance, handle);
        }
        Ok(())
    }

    /// One pass over every cached counter
    fn collect_all(&mut self, interval_secs: f64) -> Vec<EnergyDelta> {
        let handles: Vec<CounterHandle> = self.cache.values().cloned().collect();
        if handles.is_empty() {
            return Vec::new();
        }

        let results = match self.counters.collect(&handles) {
            Ok(results) => results,
            Err(e) => {
                log::warn!("Disk counter collection failed: {}", e);
                return Vec::new();
            }
        };

        handles
            .iter()
            .zip(results)
            .filter_map(|(handle, rates)| match rates {
                Ok(rates) => Some(storage_energy(&rates, interval_secs)),
                Err(e) => {
                    log::log!(
                        skip_level(&e),
                        "Disk counters for {} skipped: {}",
                        handle.instance,
                        e,
                    );
                    None
                }
            })
            // Attributed to the first tracked target, not to the instance owner
            .map(|joules| EnergyDelta::first_tracked(Component::Storage, joules))
            .collect()
    }
}

impl Monitor for StorageMonitor {
    fn component(&self) -> Component {
        Component::Storage
    }

    fn poll_once(
        &mut self,
        snapshot: &[MonitoringTarget],
        poll: &PollContext<'_>,
    ) -> Vec<EnergyDelta> {
        let mut deltas = Vec::new();

        for target in snapshot
            .iter()
            .filter(|t| t.is_enabled(Component::Storage) && !t.pids().is_empty())
        {
            if let Err(e) = self.ensure_registered(target) {
                log::log!(
                    skip_level(&e),
                    "Disk counters unavailable for {}: {}",
                    target.name(),
                    e
                );
                continue;
            }
            deltas.extend(self.collect_all(poll.interval_secs()));
        }

        deltas
    }

    fn on_refresh(&mut self, snapshot: &[MonitoringTarget]) {
        if !self.evict_stale {
            return;
        }

        let before = self.cache.len();
        self.cache.retain(|_, handle| {
            snapshot
                .iter()
                .any(|t| t.is_enabled(Component::Storage) && t.owns_pid(handle.pid))
        });
        if self.cache.len() != before {
            log::debug!("Evicted {} disk counter instances", before - self.cache.len());
        }
    }
}
