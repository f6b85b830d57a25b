//! Thread orchestrator for the energy monitors.
//!
//! Every monitor gets its own OS thread running a [`MonitorDriver`]. All
//! threads share one [`MonitoringContext`] and stop on its shutdown signal.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::component::Component;
use super::context::MonitoringContext;
use super::monitor::{Monitor, MonitorDriver, RunMode};
use crate::error::{EcoflocError, Result};

/// Running set of monitor threads
pub struct MonitorRuntime {
    ctx: Arc<MonitoringContext>,
    handles: Vec<(Component, JoinHandle<u64>)>,
}

impl MonitorRuntime {
    pub fn new(ctx: Arc<MonitoringContext>) -> Self {
        Self {
            ctx,
            handles: Vec::new(),
        }
    }

    pub fn context(&self) -> &Arc<MonitoringContext> {
        &self.ctx
    }

    /// Spawn a thread driving `monitor` in `mode`
    pub fn spawn(&mut self, monitor: Box<dyn Monitor>, mode: RunMode) -> Result<()> {
        let component = monitor.component();
        let ctx = Arc::clone(&self.ctx);

        let handle = thread::Builder::new()
            .name(format!("monitor-{}", component.label().to_lowercase()))
            .spawn(move || MonitorDriver::new(monitor, ctx).run(mode))
            .map_err(|e| {
                EcoflocError::resource_acquisition(format!(
                    "could not start {} monitor thread: {}",
                    component, e
                ))
            })?;

        self.handles.push((component, handle));
        Ok(())
    }

    /// Components with a running thread
    pub fn components(&self) -> Vec<Component> {
        self.handles.iter().map(|(c, _)| *c).collect()
    }

    /// Block until every monitor returned on its own. Returns cycles per
    /// component.
    pub fn join(self) -> Vec<(Component, u64)> {
        self.handles
            .into_iter()
            .filter_map(|(component, handle)| match handle.join() {
                Ok(cycles) => Some((component, cycles)),
                Err(_) => {
                    log::error!("{} monitor thread panicked", component);
                    None
                }
            })
            .collect()
    }

    /// Signal shutdown and wait for every monitor thread
    pub fn shutdown(self) -> Vec<(Component, u64)> {
        log::info!("Stopping {} monitors", self.handles.len());
        self.ctx.shutdown().trigger();
        self.join()
    }
}
