//! The monitor capability and the loop that drives it.
//!
//! Each component implements [`Monitor::poll_once`]; iteration policy,
//! snapshot refresh, commit and pacing live in [`MonitorDriver`] and are
//! shared by all four monitors.

use std::sync::Arc;
use std::time::Duration;

use super::component::Component;
use super::context::MonitoringContext;
use super::shutdown::ShutdownSignal;
use super::target::{MonitoringTarget, Pid};
use crate::error::EcoflocError;

/// Which target a delta is credited to
#[derive(Debug, Clone, PartialEq)]
pub enum Attribution {
    /// The target whose reference pid matches the first pid
    Owner(Vec<Pid>),
    /// The first target in the registry with any pids
    FirstTracked,
}

/// Energy produced by one measurement
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyDelta {
    pub attribution: Attribution,
    pub component: Component,
    pub joules: f64,
}

impl EnergyDelta {
    pub fn owner(pids: &[Pid], component: Component, joules: f64) -> Self {
        Self {
            attribution: Attribution::Owner(pids.to_vec()),
            component,
            joules,
        }
    }

    pub fn first_tracked(component: Component, joules: f64) -> Self {
        Self {
            attribution: Attribution::FirstTracked,
            component,
            joules,
        }
    }
}

/// Per-cycle parameters handed to a monitor
pub struct PollContext<'a> {
    pub interval: Duration,
    pub shutdown: &'a ShutdownSignal,
}

impl PollContext<'_> {
    pub fn interval_secs(&self) -> f64 {
        self.interval.as_secs_f64()
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    /// Sleep one interval. Returns `false` if shutdown interrupted the sleep.
    pub fn sleep_interval(&self) -> bool {
        !self.shutdown.wait_timeout(self.interval)
    }

    pub fn stopping(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

/// Level a skipped measurement is logged at.
///
/// Transient failures recur every cycle while a process winds down, so they
/// stay at debug; anything else is a warning.
pub fn skip_level(err: &EcoflocError) -> log::Level {
    if err.is_transient() {
        log::Level::Debug
    } else {
        log::Level::Warn
    }
}

/// A per-component energy monitor
pub trait Monitor: Send {
    fn component(&self) -> Component;

    /// Measure every relevant target of `snapshot` once.
    ///
    /// Blocking sensor queries are allowed here; the registry lock is never
    /// held while this runs.
    fn poll_once(&mut self, snapshot: &[MonitoringTarget], poll: &PollContext<'_>)
        -> Vec<EnergyDelta>;

    /// True when `poll_once` already spends the interval measuring, so the
    /// driver must not sleep again after it.
    fn self_paced(&self) -> bool {
        false
    }

    /// Called after the private snapshot was replaced
    fn on_refresh(&mut self, _snapshot: &[MonitoringTarget]) {}
}

impl<M: Monitor + ?Sized> Monitor for Box<M> {
    fn component(&self) -> Component {
        (**self).component()
    }

    fn poll_once(
        &mut self,
        snapshot: &[MonitoringTarget],
        poll: &PollContext<'_>,
    ) -> Vec<EnergyDelta> {
        (**self).poll_once(snapshot, poll)
    }

    fn self_paced(&self) -> bool {
        (**self).self_paced()
    }

    fn on_refresh(&mut self, snapshot: &[MonitoringTarget]) {
        (**self).on_refresh(snapshot)
    }
}

/// How long a monitor keeps polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Until shutdown
    Forever,
    /// A single cycle per call
    Once,
    /// `timeout / interval` cycles, interval read when the run starts
    Timeout(Duration),
}

impl RunMode {
    /// Number of cycles to run, `None` for unbounded
    pub fn iterations(&self, interval: Duration) -> Option<u64> {
        match self {
            RunMode::Forever => None,
            RunMode::Once => Some(1),
            RunMode::Timeout(timeout) => {
                let interval_ms = interval.as_millis().max(1);
                Some((timeout.as_millis() / interval_ms) as u64)
            }
        }
    }
}

/// Outcome of one driver cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub refreshed: bool,
    pub produced: usize,
    pub committed: usize,
}

/// Runs a monitor against the shared context, keeping its private snapshot
pub struct MonitorDriver<M: Monitor> {
    monitor: M,
    ctx: Arc<MonitoringContext>,
    local: Vec<MonitoringTarget>,
}

impl<M: Monitor> MonitorDriver<M> {
    pub fn new(monitor: M, ctx: Arc<MonitoringContext>) -> Self {
        Self {
            monitor,
            ctx,
            local: Vec::new(),
        }
    }

    pub fn monitor(&self) -> &M {
        &self.monitor
    }

    /// The private snapshot the monitor currently works on
    pub fn local_view(&self) -> &[MonitoringTarget] {
        &self.local
    }

    /// Run cycles according to `mode`. Returns the number of cycles run.
    pub fn run(&mut self, mode: RunMode) -> u64 {
        let component = self.monitor.component();
        let budget = mode.iterations(self.ctx.interval());
        let mut cycles = 0u64;

        log::info!("{} monitor started ({:?})", component, mode);

        while budget.map_or(true, |limit| cycles < limit) {
            if self.ctx.shutdown().is_triggered() {
                break;
            }
            let report = self.cycle();
            cycles += 1;
            log::trace!("{} cycle {}: {:?}", component, cycles, report);
        }

        log::info!("{} monitor stopped after {} cycles", component, cycles);
        cycles
    }

    /// One polling cycle: refresh the view if dirty, measure, commit, pace.
    pub fn cycle(&mut self) -> CycleReport {
        let component = self.monitor.component();
        let interval = self.ctx.interval();
        let registry = self.ctx.registry();

        let refreshed = registry.refresh_if_dirty(component, &mut self.local);
        if refreshed {
            self.monitor.on_refresh(&self.local);
        }

        let active = self.local.iter().any(|t| t.is_enabled(component));
        let deltas = if active {
            let poll = PollContext {
                interval,
                shutdown: self.ctx.shutdown(),
            };
            self.monitor.poll_once(&self.local, &poll)
        } else {
            Vec::new()
        };

        let committed = deltas.iter().filter(|delta| registry.commit(delta)).count();
        for delta in &deltas {
            log::debug!("{} delta {:.6} J -> {:?}", component, delta.joules, delta.attribution);
        }

        if !(active && self.monitor.self_paced()) {
            self.ctx.shutdown().wait_timeout(interval);
        }

        CycleReport {
            refreshed,
            produced: deltas.len(),
            committed,
        }
    }
}
